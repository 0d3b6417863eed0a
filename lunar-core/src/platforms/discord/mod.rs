// ========================================================
// File: lunar-core/src/platforms/discord/mod.rs
// ========================================================
pub mod announcer;
pub mod embed;
pub mod runtime;

pub use announcer::{BotSession, DiscordAnnouncer};
pub use embed::to_twilight_embed;
pub use runtime::DiscordPlatform;

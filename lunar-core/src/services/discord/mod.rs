// ========================================================
// File: lunar-core/src/services/discord/mod.rs
// ========================================================
pub mod guild_events;

pub use guild_events::{GuildEvent, GuildEventHandler, ReactionEvent};

// ========================================================
// File: lunar-common/src/models/mod.rs
// ========================================================
pub mod config;
pub mod discord;
pub mod platform;
pub mod stream;

pub use config::{render_member_template, BotConfig, ReactionRole, TwitchConfig, WelcomeConfig, YouTubeConfig};
pub use discord::{
    AnnouncementPayload, BotIdentity, DiscordColor, DiscordEmbed, DiscordEmbedAuthor,
    DiscordEmbedFooter, DiscordEmbedImage, DiscordEmbedThumbnail, MessageHandle,
};
pub use platform::StreamPlatform;
pub use stream::{CategoryInfo, Liveness, ProfileInfo, StreamSnapshot};

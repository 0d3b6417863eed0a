// ========================================================
// File: lunar-common/src/models/discord.rs
// ========================================================
use chrono::{DateTime, Utc};
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscordColor(pub u32);

impl DiscordColor {
    pub const TWITCH_PURPLE: DiscordColor = DiscordColor(0x6441A5);
    pub const YOUTUBE_RED: DiscordColor = DiscordColor(0xFF0000);
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedAuthor {
    pub name: String,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedThumbnail {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscordEmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

/// Platform-neutral embed; the Discord runtime turns it into a twilight `Embed`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscordEmbed {
    pub author: Option<DiscordEmbedAuthor>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub color: Option<DiscordColor>,
    pub thumbnail: Option<DiscordEmbedThumbnail>,
    pub image: Option<DiscordEmbedImage>,
    pub footer: Option<DiscordEmbedFooter>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DiscordEmbed {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What actually gets posted: the caption text plus one embed.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementPayload {
    pub content: String,
    pub embed: DiscordEmbed,
}

/// Identity of a message we posted, enough to edit it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub channel_id: Id<ChannelMarker>,
    pub message_id: Id<MessageMarker>,
}

/// The bot's own name and avatar, shown in announcement footers.
#[derive(Debug, Clone, PartialEq)]
pub struct BotIdentity {
    pub name: String,
    pub avatar_url: Option<String>,
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            name: "Lunar".to_string(),
            avatar_url: None,
        }
    }
}

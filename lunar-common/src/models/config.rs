// ========================================================
// File: lunar-common/src/models/config.rs
// ========================================================
//
// Mirrors the layout of the bot's `config.json`. Secrets may instead come from
// the environment (see `BotConfig::apply_env_overrides`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, RoleMarker};
use twilight_model::id::Id;

use crate::Error;

fn default_username() -> String {
    "Lunar".to_string()
}

fn default_activity() -> String {
    "with Admin perks".to_string()
}

fn default_poll_interval() -> u64 {
    90
}

fn default_twitch_update_interval() -> u64 {
    180
}

fn default_youtube_update_interval() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_activity")]
    pub activity: String,
    /// Image uploaded as the bot's avatar on READY (png, jpg or gif).
    #[serde(default)]
    pub avatar_path: Option<String>,
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub welcome: WelcomeConfig,
    #[serde(default)]
    pub reaction_roles: Vec<ReactionRole>,
    /// Upper bound on any single platform API request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "client-ID")]
    pub client_id: String,
    #[serde(default)]
    pub oauth_token: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "announcementChannelID")]
    pub announcement_channel_id: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub announcement_message: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_twitch_update_interval")]
    pub update_interval_secs: u64,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: String::new(),
            oauth_token: None,
            username: String::new(),
            announcement_channel_id: None,
            announcement_message: String::new(),
            poll_interval_secs: default_poll_interval(),
            update_interval_secs: default_twitch_update_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, alias = "channelID")]
    pub channel_id: String,
    #[serde(default, alias = "announcementChannelID")]
    pub announcement_channel_id: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub announcement_message: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_youtube_update_interval")]
    pub update_interval_secs: u64,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            channel_id: String::new(),
            announcement_channel_id: None,
            announcement_message: String::new(),
            poll_interval_secs: default_poll_interval(),
            update_interval_secs: default_youtube_update_interval(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "channelID")]
    pub channel_id: Option<Id<ChannelMarker>>,
    /// Supports `{user}` (mention) and `{username}`.
    #[serde(default)]
    pub join_message: String,
    #[serde(default)]
    pub leave_message: String,
}

/// A reaction on `message_id` with `emoji` grants `role_id`; removing it revokes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRole {
    pub message_id: Id<MessageMarker>,
    /// Unicode emoji, or the numeric id of a custom emoji.
    pub emoji: String,
    pub role_id: Id<RoleMarker>,
}

impl BotConfig {
    pub fn from_json(raw: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Secrets from the environment win over the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("DISCORD_TOKEN") {
            self.token = v;
        }
        if let Some(v) = non_empty("TWITCH_CLIENT_ID") {
            self.twitch.client_id = v;
        }
        if let Some(v) = non_empty("TWITCH_OAUTH_TOKEN") {
            self.twitch.oauth_token = Some(v);
        }
        if let Some(v) = non_empty("YOUTUBE_API_KEY") {
            self.youtube.api_key = v;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.token.trim().is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("requestTimeoutSecs must be positive".into()));
        }

        if self.twitch.enabled {
            let t = &self.twitch;
            if t.client_id.trim().is_empty() {
                return Err(Error::Config("twitch.clientId is required when Twitch is enabled".into()));
            }
            if t.username.trim().is_empty() {
                return Err(Error::Config("twitch.username is required when Twitch is enabled".into()));
            }
            if t.announcement_channel_id.is_none() {
                return Err(Error::Config("twitch.announcementChannelId is required".into()));
            }
            if t.poll_interval_secs == 0 || t.update_interval_secs == 0 {
                return Err(Error::Config("twitch polling intervals must be positive".into()));
            }
        }

        if self.youtube.enabled {
            let y = &self.youtube;
            if y.api_key.trim().is_empty() {
                return Err(Error::Config("youtube.apiKey is required when YouTube is enabled".into()));
            }
            if y.channel_id.trim().is_empty() {
                return Err(Error::Config("youtube.channelId is required when YouTube is enabled".into()));
            }
            if y.announcement_channel_id.is_none() {
                return Err(Error::Config("youtube.announcementChannelId is required".into()));
            }
            if y.poll_interval_secs == 0 || y.update_interval_secs == 0 {
                return Err(Error::Config("youtube polling intervals must be positive".into()));
            }
        }

        if self.welcome.enabled && self.welcome.channel_id.is_none() {
            return Err(Error::Config("welcome.channelId is required when welcome messages are enabled".into()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TwitchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

impl YouTubeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }
}

/// Fills `{user}` and `{username}` in a welcome/leave template.
pub fn render_member_template(template: &str, mention: &str, username: &str) -> String {
    template.replace("{user}", mention).replace("{username}", username)
}

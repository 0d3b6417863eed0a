// ========================================================
// File: lunar-common/src/models/platform.rs
// ========================================================
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::models::discord::DiscordColor;

/// Streaming platforms we can watch for live broadcasts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StreamPlatform {
    Twitch,
    YouTube,
}

impl StreamPlatform {
    /// Human-facing name used in announcement text ("... is now LIVE on Twitch!").
    pub fn label(&self) -> &'static str {
        match self {
            StreamPlatform::Twitch => "Twitch",
            StreamPlatform::YouTube => "YouTube",
        }
    }

    pub fn color(&self) -> DiscordColor {
        match self {
            StreamPlatform::Twitch => DiscordColor::TWITCH_PURPLE,
            StreamPlatform::YouTube => DiscordColor::YOUTUBE_RED,
        }
    }
}

impl fmt::Display for StreamPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPlatform::Twitch => write!(f, "twitch"),
            StreamPlatform::YouTube => write!(f, "youtube"),
        }
    }
}

impl FromStr for StreamPlatform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitch" => Ok(StreamPlatform::Twitch),
            "youtube" => Ok(StreamPlatform::YouTube),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

// ========================================================
// File: lunar-common/src/models/stream.rs
// ========================================================
use chrono::{DateTime, Utc};

/// One live broadcast as reported by a liveness poll.
///
/// Rebuilt from scratch on every poll; nothing here is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSnapshot {
    pub streamer_name: String,
    pub title: String,
    pub viewer_count: u64,
    /// Twitch `game_id` or YouTube `categoryId`.
    pub category_id: String,
    /// Preview image URL. May carry `{width}`/`{height}` tokens.
    pub thumbnail_url_template: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Where viewers go to watch.
    pub stream_url: String,
}

/// Broadcaster profile (auxiliary fetch).
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInfo {
    pub display_name: String,
    pub profile_image_url: String,
}

/// Game / category metadata (auxiliary fetch).
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    /// Box art with `{width}`/`{height}` tokens. YouTube categories carry none.
    pub art_url_template: Option<String>,
}

/// Outcome of a single liveness poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Liveness {
    /// The API answered and the channel is broadcasting.
    Live(StreamSnapshot),
    /// The API answered with an empty stream list.
    Offline,
    /// Transport failure, non-200 status or an unparseable body.
    /// Carries no information about the channel, so no transition may follow.
    Unavailable,
}


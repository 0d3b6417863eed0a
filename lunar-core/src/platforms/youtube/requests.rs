// ========================================================
// File: lunar-core/src/platforms/youtube/requests.rs
// ========================================================
//! YouTube Data API v3 lookups.
//!
//! A liveness poll is two requests: `search` (eventType=live) finds the live
//! video id, `videos` fills in viewers, start time and category.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use lunar_common::models::{CategoryInfo, Liveness, ProfileInfo, StreamPlatform, StreamSnapshot};

use crate::http::ApiClient;
use crate::platforms::StreamSource;

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub snippet: VideoSnippet,
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    pub channel_title: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    pub actual_start_time: Option<DateTime<Utc>>,
    /// The API sends this as a decimal string.
    pub concurrent_viewers: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Thumbnails {
    pub default: Option<Thumbnail>,
    pub medium: Option<Thumbnail>,
    pub high: Option<Thumbnail>,
    pub maxres: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

impl Thumbnails {
    /// Largest available rendition.
    pub fn best(&self) -> Option<&str> {
        [&self.maxres, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|t| t.url.as_str())
            .next()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelItem {
    pub snippet: ChannelSnippet,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSnippet {
    pub title: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
pub struct CategoryItem {
    pub id: String,
    pub snippet: CategorySnippet,
}

#[derive(Debug, Deserialize)]
pub struct CategorySnippet {
    pub title: String,
}

/// Watches one YouTube channel for live broadcasts.
pub struct YouTubeStreamSource {
    client: Arc<dyn ApiClient>,
    channel_id: String,
}

impl YouTubeStreamSource {
    pub fn new(client: Arc<dyn ApiClient>, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Option<Vec<T>> {
        match self.client.call(path, query).await {
            Ok(data) => match data.parse::<ListResponse<T>>() {
                Ok(parsed) => parsed.map(|r| r.items),
                Err(e) => {
                    warn!("(YouTube) could not parse '{path}' response: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("(YouTube) request to '{path}' failed: {e}");
                None
            }
        }
    }
}

fn snapshot_from_video(video: VideoItem) -> StreamSnapshot {
    let details = video.live_streaming_details;
    let viewer_count = details
        .as_ref()
        .and_then(|d| d.concurrent_viewers.as_deref())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    let started_at = details.and_then(|d| d.actual_start_time);

    StreamSnapshot {
        streamer_name: video.snippet.channel_title,
        title: video.snippet.title,
        viewer_count,
        category_id: video.snippet.category_id,
        thumbnail_url_template: video.snippet.thumbnails.best().unwrap_or_default().to_string(),
        started_at,
        stream_url: format!("https://www.youtube.com/watch?v={}", video.id),
    }
}

#[async_trait]
impl StreamSource for YouTubeStreamSource {
    fn platform(&self) -> StreamPlatform {
        StreamPlatform::YouTube
    }

    async fn check_live(&self) -> Liveness {
        let Some(found) = self
            .list::<SearchItem>(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", self.channel_id.as_str()),
                    ("eventType", "live"),
                    ("type", "video"),
                ],
            )
            .await
        else {
            return Liveness::Unavailable;
        };

        let Some(video_id) = found.into_iter().find_map(|item| item.id.video_id) else {
            return Liveness::Offline;
        };

        let Some(videos) = self
            .list::<VideoItem>(
                "videos",
                &[("part", "snippet,liveStreamingDetails"), ("id", video_id.as_str())],
            )
            .await
        else {
            return Liveness::Unavailable;
        };

        match videos.into_iter().next() {
            Some(video) => {
                debug!("(YouTube) {} is live: '{}'", video.snippet.channel_title, video.snippet.title);
                Liveness::Live(snapshot_from_video(video))
            }
            // search and videos disagree; let the next poll settle it
            None => Liveness::Unavailable,
        }
    }

    async fn fetch_profile(&self, _snapshot: &StreamSnapshot) -> Option<ProfileInfo> {
        let channels = self
            .list::<ChannelItem>("channels", &[("part", "snippet"), ("id", self.channel_id.as_str())])
            .await?;
        let channel = channels.into_iter().next()?;
        let profile_image_url = channel.snippet.thumbnails.best()?.to_string();
        Some(ProfileInfo {
            display_name: channel.snippet.title,
            profile_image_url,
        })
    }

    async fn fetch_category(&self, snapshot: &StreamSnapshot) -> Option<CategoryInfo> {
        let categories = self
            .list::<CategoryItem>(
                "videoCategories",
                &[("part", "snippet"), ("id", snapshot.category_id.as_str())],
            )
            .await?;
        let category = categories.into_iter().next()?;
        Some(CategoryInfo {
            id: category.id,
            name: category.snippet.title,
            art_url_template: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiData;
    use crate::test_utils::ScriptedApi;
    use serde_json::json;

    fn search_hit() -> ApiData {
        ApiData::Present(json!({
            "items": [{ "id": { "kind": "youtube#video", "videoId": "abc123" },
                        "snippet": { "title": "live now" } }]
        }))
    }

    fn video() -> ApiData {
        ApiData::Present(json!({
            "items": [{
                "id": "abc123",
                "snippet": {
                    "title": "Speedrun practice",
                    "channelTitle": "Lunar",
                    "categoryId": "20",
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/vi/abc123/default_live.jpg" },
                        "high": { "url": "https://i.ytimg.com/vi/abc123/hqdefault_live.jpg" }
                    }
                },
                "liveStreamingDetails": {
                    "actualStartTime": "2024-05-01T18:00:00Z",
                    "concurrentViewers": "1337"
                }
            }]
        }))
    }

    #[tokio::test]
    async fn test_check_live_joins_search_and_video() {
        let api = Arc::new(ScriptedApi::new());
        api.push("search", search_hit());
        api.push("videos", video());
        let source = YouTubeStreamSource::new(api.clone(), "UC123");

        let Liveness::Live(snap) = source.check_live().await else {
            panic!("expected live");
        };
        assert_eq!(snap.streamer_name, "Lunar");
        assert_eq!(snap.viewer_count, 1337);
        assert_eq!(snap.category_id, "20");
        assert_eq!(snap.stream_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(snap.thumbnail_url_template, "https://i.ytimg.com/vi/abc123/hqdefault_live.jpg");

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("search?part=snippet&channelId=UC123&eventType=live"));
        assert_eq!(calls[1], "videos?part=snippet,liveStreamingDetails&id=abc123");
    }

    #[tokio::test]
    async fn test_check_live_offline_and_unavailable() {
        let api = Arc::new(ScriptedApi::new());
        api.push("search", ApiData::Present(json!({ "items": [] })));
        api.push("search", ApiData::Absent);
        api.push("search", search_hit());
        api.push_error("videos");
        let source = YouTubeStreamSource::new(api, "UC123");

        assert_eq!(source.check_live().await, Liveness::Offline);
        assert_eq!(source.check_live().await, Liveness::Unavailable);
        assert_eq!(source.check_live().await, Liveness::Unavailable);
    }

    #[tokio::test]
    async fn test_profile_and_category() {
        let api = Arc::new(ScriptedApi::new());
        api.push(
            "channels",
            ApiData::Present(json!({ "items": [{ "snippet": {
                "title": "Lunar",
                "thumbnails": { "default": { "url": "https://yt3.ggpht.com/avatar.jpg" } }
            }}]})),
        );
        api.push(
            "videoCategories",
            ApiData::Present(json!({ "items": [{ "id": "20", "snippet": { "title": "Gaming" } }] })),
        );
        let source = YouTubeStreamSource::new(api, "UC123");
        let mut snap = crate::test_utils::sample_snapshot();
        snap.category_id = "20".into();

        let profile = source.fetch_profile(&snap).await.unwrap();
        assert_eq!(profile.profile_image_url, "https://yt3.ggpht.com/avatar.jpg");
        let category = source.fetch_category(&snap).await.unwrap();
        assert_eq!(category.name, "Gaming");
        assert!(category.art_url_template.is_none());
    }
}

// ========================================================
// File: lunar-core/src/platforms/twitch/requests/stream.rs
// ========================================================
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use lunar_common::models::{CategoryInfo, Liveness, ProfileInfo, StreamPlatform, StreamSnapshot};

use crate::http::ApiClient;
use crate::platforms::StreamSource;

/// Response from "Get Streams" endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamsResponse {
    pub data: Vec<StreamData>,
}

/// Single stream data record.
#[derive(Debug, Deserialize)]
pub struct StreamData {
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    pub title: String,
    pub viewer_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub thumbnail_url: String,
}

/// Response from "Get Users" endpoint.
#[derive(Debug, Deserialize)]
pub struct UsersResponse {
    pub data: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub login: String,
    pub display_name: String,
    pub profile_image_url: String,
}

/// Response from "Get Games" endpoint.
#[derive(Debug, Deserialize)]
pub struct GamesResponse {
    pub data: Vec<GameData>,
}

#[derive(Debug, Deserialize)]
pub struct GameData {
    pub id: String,
    pub name: String,
    pub box_art_url: String,
}

/// Watches one Twitch channel through Helix.
pub struct TwitchStreamSource {
    client: Arc<dyn ApiClient>,
    username: String,
}

impl TwitchStreamSource {
    pub fn new(client: Arc<dyn ApiClient>, username: impl Into<String>) -> Self {
        Self {
            client,
            username: username.into(),
        }
    }

    /// One GET, with every failure folded into `None` after logging.
    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Option<T> {
        match self.client.call(path, query).await {
            Ok(data) => match data.parse::<T>() {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("(Twitch) could not parse '{path}' response: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("(Twitch) request to '{path}' failed: {e}");
                None
            }
        }
    }
}

impl From<StreamData> for StreamSnapshot {
    fn from(stream: StreamData) -> Self {
        let stream_url = format!("https://twitch.tv/{}", stream.user_login);
        StreamSnapshot {
            streamer_name: stream.user_name,
            title: stream.title,
            viewer_count: stream.viewer_count,
            category_id: stream.game_id,
            thumbnail_url_template: stream.thumbnail_url,
            started_at: stream.started_at,
            stream_url,
        }
    }
}

#[async_trait]
impl StreamSource for TwitchStreamSource {
    fn platform(&self) -> StreamPlatform {
        StreamPlatform::Twitch
    }

    async fn check_live(&self) -> Liveness {
        let streams: Option<StreamsResponse> =
            self.get("streams", &[("user_login", self.username.as_str())]).await;

        match streams {
            None => Liveness::Unavailable,
            Some(resp) => match resp.data.into_iter().next() {
                Some(stream) => {
                    debug!("(Twitch) {} is live: '{}'", stream.user_name, stream.title);
                    Liveness::Live(stream.into())
                }
                None => Liveness::Offline,
            },
        }
    }

    async fn fetch_profile(&self, _snapshot: &StreamSnapshot) -> Option<ProfileInfo> {
        let users: UsersResponse = self.get("users", &[("login", self.username.as_str())]).await?;
        let user = users.data.into_iter().next()?;
        Some(ProfileInfo {
            display_name: user.display_name,
            profile_image_url: user.profile_image_url,
        })
    }

    async fn fetch_category(&self, snapshot: &StreamSnapshot) -> Option<CategoryInfo> {
        let games: GamesResponse = self.get("games", &[("id", snapshot.category_id.as_str())]).await?;
        let game = games.data.into_iter().next()?;
        Some(CategoryInfo {
            id: game.id,
            name: game.name,
            art_url_template: Some(game.box_art_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiData;
    use crate::test_utils::ScriptedApi;
    use serde_json::json;

    fn live_streams() -> serde_json::Value {
        json!({
            "data": [{
                "id": "1", "user_id": "9", "user_login": "lunarlive", "user_name": "LunarLive",
                "game_id": "509658", "game_name": "Just Chatting", "type": "live",
                "title": "late night build", "viewer_count": 42,
                "started_at": "2021-03-10T15:04:21Z", "language": "en",
                "thumbnail_url": "https://static-cdn.jtvnw.net/previews-ttv/live_user_lunarlive-{width}x{height}.jpg"
            }]
        })
    }

    #[tokio::test]
    async fn test_check_live_maps_first_stream() {
        let api = Arc::new(ScriptedApi::new());
        api.push("streams", ApiData::Present(live_streams()));
        let source = TwitchStreamSource::new(api.clone(), "lunarlive");

        let Liveness::Live(snap) = source.check_live().await else {
            panic!("expected live");
        };
        assert_eq!(snap.streamer_name, "LunarLive");
        assert_eq!(snap.viewer_count, 42);
        assert_eq!(snap.category_id, "509658");
        assert_eq!(snap.stream_url, "https://twitch.tv/lunarlive");
        assert!(snap.started_at.is_some());
        assert_eq!(api.calls(), vec!["streams?user_login=lunarlive".to_string()]);
    }

    #[tokio::test]
    async fn test_check_live_distinguishes_offline_from_unavailable() {
        let api = Arc::new(ScriptedApi::new());
        api.push("streams", ApiData::Present(json!({ "data": [] })));
        api.push("streams", ApiData::Absent);
        api.push("streams", ApiData::Present(json!({ "unexpected": true })));
        api.push_error("streams");
        let source = TwitchStreamSource::new(api, "lunarlive");

        assert_eq!(source.check_live().await, Liveness::Offline);
        assert_eq!(source.check_live().await, Liveness::Unavailable);
        assert_eq!(source.check_live().await, Liveness::Unavailable);
        assert_eq!(source.check_live().await, Liveness::Unavailable);
    }

    #[tokio::test]
    async fn test_auxiliary_fetches() {
        let api = Arc::new(ScriptedApi::new());
        api.push("streams", ApiData::Present(live_streams()));
        api.push(
            "users",
            ApiData::Present(json!({ "data": [{
                "id": "9", "login": "lunarlive", "display_name": "LunarLive",
                "profile_image_url": "https://cdn.example/pfp.png"
            }]})),
        );
        api.push(
            "games",
            ApiData::Present(json!({ "data": [{
                "id": "509658", "name": "Just Chatting",
                "box_art_url": "https://cdn.example/art-{width}x{height}.jpg"
            }]})),
        );
        let source = TwitchStreamSource::new(api.clone(), "lunarlive");

        let Liveness::Live(snap) = source.check_live().await else {
            panic!("expected live");
        };
        let profile = source.fetch_profile(&snap).await.unwrap();
        assert_eq!(profile.profile_image_url, "https://cdn.example/pfp.png");
        let game = source.fetch_category(&snap).await.unwrap();
        assert_eq!(game.name, "Just Chatting");
        assert!(api.calls().contains(&"games?id=509658".to_string()));
    }

    #[tokio::test]
    async fn test_auxiliary_fetch_with_empty_data_is_none() {
        let api = Arc::new(ScriptedApi::new());
        api.push("users", ApiData::Present(json!({ "data": [] })));
        api.push("games", ApiData::Absent);
        let source = TwitchStreamSource::new(api, "lunarlive");
        let snap = crate::test_utils::sample_snapshot();

        assert!(source.fetch_profile(&snap).await.is_none());
        assert!(source.fetch_category(&snap).await.is_none());
    }
}

// ========================================================
// File: lunar-core/src/platforms/youtube/client.rs
// ========================================================
use std::time::Duration;

use crate::http::{ApiAuth, RestClient};
use crate::Error;

pub const DATA_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

pub const DATA_API_ENDPOINTS: &[&str] = &["search", "videos", "channels", "videoCategories"];

/// Builds a YouTube Data API client. The API key rides along as `?key=`.
pub fn data_api_client(api_key: &str, timeout: Duration) -> Result<RestClient, Error> {
    RestClient::new(
        DATA_API_BASE_URL,
        ApiAuth::QueryKey {
            name: "key".to_string(),
            value: api_key.to_string(),
        },
        DATA_API_ENDPOINTS,
        timeout,
    )
}

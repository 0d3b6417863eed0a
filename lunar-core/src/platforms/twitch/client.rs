// ========================================================
// File: lunar-core/src/platforms/twitch/client.rs
// ========================================================
use std::time::Duration;

use crate::http::{ApiAuth, RestClient};
use crate::Error;

pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix/";

/// Helix resources the announcer reads.
pub const HELIX_ENDPOINTS: &[&str] = &["streams", "users", "games"];

/// Builds a Helix client.
///
/// - `client_id`: the application's Client-ID, sent on every request
/// - `bearer_token`: an app or user access token; Helix rejects requests
///   without one, but it is optional here so a Client-ID-only setup still
///   starts and logs the 401s
pub fn helix_client(
    client_id: &str,
    bearer_token: Option<&str>,
    timeout: Duration,
) -> Result<RestClient, Error> {
    let mut headers = vec![("Client-ID".to_string(), client_id.to_string())];
    if let Some(token) = bearer_token.filter(|t| !t.is_empty()) {
        headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    }
    RestClient::new(HELIX_BASE_URL, ApiAuth::Headers(headers), HELIX_ENDPOINTS, timeout)
}

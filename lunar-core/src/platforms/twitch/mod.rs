// ========================================================
// File: lunar-core/src/platforms/twitch/mod.rs
// ========================================================
pub mod client;
pub mod requests;

pub use client::{helix_client, HELIX_BASE_URL, HELIX_ENDPOINTS};
pub use requests::stream::TwitchStreamSource;

// ========================================================
// File: lunar-core/src/platforms/youtube/mod.rs
// ========================================================
pub mod client;
pub mod requests;

pub use client::{data_api_client, DATA_API_BASE_URL, DATA_API_ENDPOINTS};
pub use requests::YouTubeStreamSource;

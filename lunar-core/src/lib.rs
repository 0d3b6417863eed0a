// ========================================================
// File: lunar-core/src/lib.rs
// ========================================================
pub mod http;
pub mod platforms;
pub mod services;
pub mod tasks;
pub mod test_utils;

pub use http::{ApiAuth, ApiClient, ApiData, RestClient};
pub use lunar_common::error::Error;

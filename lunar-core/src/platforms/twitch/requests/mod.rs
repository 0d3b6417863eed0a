// ========================================================
// File: lunar-core/src/platforms/twitch/requests/mod.rs
// ========================================================
pub mod stream;

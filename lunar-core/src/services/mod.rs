// ========================================================
// File: lunar-core/src/services/mod.rs
// ========================================================
pub mod announcement;
pub mod discord;
pub mod stream_poller;

pub use stream_poller::{PollOutcome, PollerSettings, RefreshOutcome, StreamPoller};

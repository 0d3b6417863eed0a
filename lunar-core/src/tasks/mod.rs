// ========================================================
// File: lunar-core/src/tasks/mod.rs
// ========================================================
pub mod stream_poll;

pub use stream_poll::spawn_stream_poll_task;

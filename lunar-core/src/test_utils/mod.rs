// ========================================================
// File: lunar-core/src/test_utils/mod.rs
// ========================================================
//
// In-memory fakes for the network seams, shared by unit and integration tests.

pub mod helpers;

pub use helpers::*;

//! Integration test utilities for the ops control plane
//!
//! Spawns the real Axum application on a loopback port with in-memory
//! database and plan-history backends, and documents in a temp directory.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

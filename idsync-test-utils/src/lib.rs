//! Test utilities for the idsync reconciliation engine
//!
//! This crate provides a scripted mock gateway, an in-memory row source,
//! and builders for the identity API's response envelopes.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{embedded_teams, embedded_users};
pub use mocks::{MemoryRowSource, MockGateway};

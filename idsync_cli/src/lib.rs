//! Plumbing around the reconciliation engine
//!
//! Configuration, the signed HTTP gateway, and the CSV row source. The
//! engine itself lives in `idsync_core`.

pub mod config;
pub mod gateway;
pub mod signer;
pub mod source;

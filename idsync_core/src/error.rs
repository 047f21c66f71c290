//! Error types for the reconciliation engine
//!
//! Resolution failures (`ResolveError`) are raised while mapping names to
//! identifiers and are converted to row outcomes at the batch boundary.
//! Gateway failures (`GatewayError`) indicate the API itself is unreachable
//! and abort the whole run.

use thiserror::Error;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the reconciliation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Name-resolution failures, caught once per row by the batch driver
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Transport-level failures from the API gateway
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Payload serialization failures
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Row-source persistence failures
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures raised while resolving a user or team name to an identifier
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A non-empty result set contained no case-insensitive match
    #[error("Unable to find a member of list with {field} equal to {value}")]
    NoExactMatch { field: String, value: String },

    /// The result set was empty, or bounded retries were exhausted
    #[error("{0}")]
    NoResult(String),

    /// The team-creation call returned a non-created status
    #[error("Unable to create team: {status} - {body}")]
    UnableToCreateTeam {
        status: u16,
        body: serde_json::Value,
    },
}

/// Transport-level failures from the gateway collaborator
///
/// These are never converted to row outcomes: further rows would fail
/// identically, so the batch flushes and terminates instead.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("request signing failed: {0}")]
    Signing(String),
}

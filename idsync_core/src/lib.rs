//! Reconciliation engine for bulk user and team synchronization
//!
//! This library drives a tabular set of user change requests against a
//! remote identity-management API: it decides create-vs-update per row,
//! resolves team names to identifiers (creating missing teams lazily),
//! retries transient lookup failures, and persists every row's outcome so
//! interrupted runs resume without duplicating side effects.
//!
//! Transport, request signing, and the storage format of the row table live
//! behind the [`gateway::ApiGateway`] and [`batch::RowSource`] seams in the
//! binary crate.

pub mod batch;
pub mod error;
pub mod gateway;
pub mod model;
pub mod payload;
pub mod processor;
pub mod retry;
pub mod teams;

// Re-export main types
pub use batch::{BatchDriver, BatchSummary, RowSource};
pub use error::{Error, GatewayError, ResolveError, Result};
pub use gateway::{ApiGateway, ApiRequest, ApiResponse, Method};
pub use model::{
    ApiCredentials, NONE_SENTINEL, Relationship, RowOutcome, STATUS_SUCCESS, TeamMembership,
    UserRow,
};
pub use payload::{PayloadBuilder, UserPayload};
pub use processor::{ProcessorOptions, RowProcessor};
pub use retry::{AttemptCounter, RetryPolicy};
pub use teams::{TeamCache, TeamResolver};

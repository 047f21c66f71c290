//! Bounded retry around lookup calls
//!
//! Only read operations are retried. Create and update calls are never
//! re-issued: a blind retry of a non-idempotent mutation could duplicate a
//! team or an account.

use crate::error::{Error, ResolveError, Result};
use crate::gateway::{ApiGateway, ApiRequest, ApiResponse};
use log::{debug, warn};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Transient-failure counter shared by all lookups within one row.
/// The batch driver resets it at the start of each row.
#[derive(Debug, Default)]
pub struct AttemptCounter(AtomicU32);

impl AttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    /// Records one transient failure and returns the new total
    pub fn record_failure(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Retry tunables for lookup calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Ceiling on transient failures per row before giving up
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy with no inter-attempt delay, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    /// Issues a lookup request, re-issuing it on non-2xx responses until the
    /// shared counter reaches the ceiling, then raises a terminal
    /// [`ResolveError::NoResult`]. Transport errors are not retried.
    pub async fn fetch(
        &self,
        gateway: &dyn ApiGateway,
        request: ApiRequest,
        attempts: &AttemptCounter,
        what: &str,
    ) -> Result<ApiResponse> {
        loop {
            let response = gateway.call(request.clone()).await?;
            if response.is_success() {
                return Ok(response);
            }

            warn!("ERROR: trying to get {what}: code: {}", response.status);
            debug!("response body: {}", response.body);

            let failed = attempts.record_failure();
            if failed >= self.max_attempts {
                return Err(Error::Resolve(ResolveError::NoResult(format!(
                    "ERROR: trying to get {what}"
                ))));
            }
            tokio::time::sleep(self.delay).await;
        }
    }
}

//! Resumable batch driver
//!
//! Iterates rows in source order, skips rows already marked successful, and
//! flushes every outcome before the next row begins. A final flush runs on
//! every exit path, so a crash after row N preserves rows 1..N.

use crate::error::{Error, Result};
use crate::gateway::ApiGateway;
use crate::model::{RowOutcome, STATUS_SUCCESS, UserRow};
use crate::processor::{ProcessorOptions, RowProcessor};
use crate::retry::{AttemptCounter, RetryPolicy};
use crate::teams::TeamCache;
use log::{error, info};
use std::sync::Arc;

/// Persisted row table the driver reads from and writes outcomes back to
pub trait RowSource {
    /// Number of data rows
    fn row_count(&self) -> usize;

    /// Parses the input fields of one row; outcome columns are not included
    fn load(&self, index: usize) -> UserRow;

    /// Persisted status of a row from a previous run, if any
    fn status(&self, index: usize) -> Option<String>;

    /// Writes a row's outcome fields in memory
    fn record(&mut self, index: usize, outcome: &RowOutcome);

    /// Persists the whole table durably
    fn flush(&mut self) -> std::io::Result<()>;
}

/// Counters for one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows actually processed this run
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows skipped because a previous run already succeeded
    pub skipped: usize,
}

/// Drives a whole run over a row source
pub struct BatchDriver<S: RowSource> {
    source: S,
    processor: RowProcessor,
    attempts: Arc<AttemptCounter>,
}

impl<S: RowSource> BatchDriver<S> {
    pub fn new(
        source: S,
        gateway: Arc<dyn ApiGateway>,
        retry: RetryPolicy,
        options: ProcessorOptions,
    ) -> Self {
        let cache = Arc::new(TeamCache::new());
        let attempts = Arc::new(AttemptCounter::new());
        let processor = RowProcessor::new(gateway, retry, cache, attempts.clone(), options);
        Self {
            source,
            processor,
            attempts,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Processes every non-successful row in order. The final flush runs
    /// even when a transport failure aborts the loop.
    pub async fn run(&mut self) -> Result<BatchSummary> {
        let result = self.drive().await;
        if let Err(flush_err) = self.source.flush() {
            error!("final flush of the row source failed: {flush_err}");
            if result.is_ok() {
                return Err(Error::Io(flush_err));
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<BatchSummary> {
        let total = self.source.row_count();
        let mut summary = BatchSummary::default();

        for index in 0..total {
            self.attempts.reset();

            if self
                .source
                .status(index)
                .is_some_and(|status| status == STATUS_SUCCESS)
            {
                info!("Skipping row {}/{total} as it was already done", index + 1);
                summary.skipped += 1;
                continue;
            }

            info!("Importing row {}/{total}:", index + 1);
            let row = self.source.load(index);
            let outcome = match self.processor.process(&row).await {
                Ok(outcome) => outcome,
                // Resolution failures become row outcomes; anything else
                // (transport, serialization) aborts the batch.
                Err(Error::Resolve(resolve_err)) => RowOutcome::failure(resolve_err.to_string()),
                Err(other) => return Err(other),
            };

            summary.processed += 1;
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }

            self.source.record(index, &outcome);
            self.source.flush()?;
            info!("Finished importing row {}/{total}", index + 1);
        }

        Ok(summary)
    }
}

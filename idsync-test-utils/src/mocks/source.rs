//! In-memory row source for driver tests

use idsync_core::batch::RowSource;
use idsync_core::model::{RowOutcome, UserRow};

/// [`RowSource`] backed by vectors, tracking recorded outcomes and flush
/// calls so tests can assert on persistence behavior
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    rows: Vec<UserRow>,
    statuses: Vec<Option<String>>,
    outcomes: Vec<Option<RowOutcome>>,
    flush_count: usize,
}

impl MemoryRowSource {
    pub fn new(rows: Vec<UserRow>) -> Self {
        let count = rows.len();
        Self {
            rows,
            statuses: vec![None; count],
            outcomes: vec![None; count],
            flush_count: 0,
        }
    }

    /// Pre-seeds a persisted status, as a previous run would have left it
    pub fn set_status(&mut self, index: usize, status: &str) {
        self.statuses[index] = Some(status.to_string());
    }

    pub fn outcome(&self, index: usize) -> Option<&RowOutcome> {
        self.outcomes[index].as_ref()
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }
}

impl RowSource for MemoryRowSource {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn load(&self, index: usize) -> UserRow {
        self.rows[index].clone()
    }

    fn status(&self, index: usize) -> Option<String> {
        self.statuses[index].clone()
    }

    fn record(&mut self, index: usize, outcome: &RowOutcome) {
        self.statuses[index] = Some(outcome.status.clone());
        self.outcomes[index] = Some(outcome.clone());
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_count += 1;
        Ok(())
    }
}

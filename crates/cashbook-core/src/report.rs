//! Outcome of multi-record operations that continue past individual failures.

use tracing::warn;
use uuid::Uuid;

use crate::CoreError;

/// One record a batch could not write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result of one write, logging failures.
    pub fn record(&mut self, id: Uuid, result: Result<(), CoreError>) {
        match result {
            Ok(()) => self.succeeded.push(id),
            Err(err) => {
                warn!(record = %id, error = %err, "batch write failed; continuing");
                self.failed.push(BatchFailure {
                    id,
                    reason: err.to_string(),
                });
            }
        }
    }

    pub fn merge(&mut self, other: BatchReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

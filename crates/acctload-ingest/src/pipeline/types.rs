//! Values passed between the orchestrator and its workers

use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use super::barrier::WorkUnit;
use super::gateway::GatewayError;
use crate::account::AccountRecord;

/// A record on its way through the dispatch queue, with its accounting token
#[derive(Debug)]
pub(crate) struct WorkItem {
    pub index: usize,
    pub record: AccountRecord,
    pub unit: WorkUnit,
}

/// A failed insert as reported by a worker
#[derive(Debug)]
pub(crate) struct WorkerFailure {
    pub index: usize,
    pub code: String,
    pub error: GatewayError,
}

/// Per-worker tally returned when a worker exits
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// In-flight inserts abandoned because the run was cancelled
    pub interrupted: usize,
}

/// A failed record in the run report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the source sequence
    pub index: usize,
    pub code: String,
    pub error: String,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub workers: usize,
    /// Records in the source sequence
    pub total: usize,
    /// Records handed to the dispatch queue
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records never written nor failed (dispatch stopped early)
    pub skipped: usize,
    /// From first submission until the completion barrier released
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub failures: Vec<RecordFailure>,
}

impl IngestReport {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} accounts inserted ({} failed, {} skipped) by {} workers in {:?}",
            self.succeeded, self.total, self.failed, self.skipped, self.workers, self.elapsed
        )
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

//! Errors that end an ingestion run

use acctload_common::AcctloadError;
use thiserror::Error;

use crate::pipeline::{GatewayError, IngestReport};

/// Result type alias for ingestion runs
pub type IngestResult<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The record source failed; nothing was dispatched
    #[error("Failed to load records from {origin}: {source}")]
    Source {
        origin: String,
        #[source]
        source: AcctloadError,
    },

    #[error("Invalid pipeline configuration: {0}")]
    Config(#[source] AcctloadError),

    /// First insert failure under the fail-fast policy
    #[error("Insert failed for account '{code}' (record {index}): {source}")]
    RecordFailed {
        index: usize,
        code: String,
        #[source]
        source: GatewayError,
        report: Box<IngestReport>,
    },

    #[error("Ingestion cancelled after {processed} of {total} records")]
    Cancelled {
        processed: usize,
        total: usize,
        report: Box<IngestReport>,
    },

    #[error("Worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
}

impl IngestError {
    /// Tally of a run that stopped early, if it got as far as dispatching
    pub fn partial_report(&self) -> Option<&IngestReport> {
        match self {
            IngestError::RecordFailed { report, .. } | IngestError::Cancelled { report, .. } => {
                Some(report.as_ref())
            },
            _ => None,
        }
    }
}

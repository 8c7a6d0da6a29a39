//! Record source interface
//!
//! Implement this trait for anything that can produce a fully materialized
//! sequence of account records (an XML export, a fixture, another database).

use acctload_common::Result;
use async_trait::async_trait;

use crate::account::AccountRecord;

/// Produces the complete record sequence for one ingestion run
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Load every record, in source order
    ///
    /// Called exactly once per run, before any record is dispatched. An error
    /// here ends the run before a single write is attempted.
    async fn load(&self) -> Result<Vec<AccountRecord>>;

    /// Human-readable origin used in logs (a path, a fixture name)
    fn describe(&self) -> String;
}

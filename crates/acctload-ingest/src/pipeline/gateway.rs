//! Persistence gateway interface

use async_trait::async_trait;
use thiserror::Error;

use crate::account::AccountRecord;

/// Failure of a single insert
#[derive(Error, Debug)]
pub enum GatewayError {
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Insert rejected: {0}")]
    Rejected(String),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
}

/// Writes one account per call
///
/// The pipeline calls this from every worker at once, so implementations must
/// tolerate that many concurrent callers (typically by drawing connections
/// from a pool).
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Insert `account` and return the identifier generated by the store
    async fn insert_account(&self, account: &AccountRecord) -> Result<i64, GatewayError>;
}

//! Account import pipeline
//!
//! Loads trading accounts from an XML export and writes them to PostgreSQL
//! through a fixed pool of concurrent workers.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use acctload_ingest::{config::ImportConfig, storage, IngestOrchestrator, XmlAccountSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ImportConfig::from_env()?;
//!     let pool = storage::connect(&config.database).await?;
//!     let gateway = Arc::new(storage::PgAccountGateway::new(pool));
//!
//!     let source = XmlAccountSource::from_config(&config.source);
//!     let report = IngestOrchestrator::new(config.pipeline, gateway)
//!         .run_source(&source)
//!         .await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod account;
pub mod config;
pub mod error;
pub mod pipeline;
#[cfg(feature = "database")]
pub mod storage;

pub use account::{AccountRecord, XmlAccountSource};
pub use config::{FailurePolicy, ImportConfig};
pub use error::{IngestError, IngestResult};
pub use pipeline::{IngestOrchestrator, IngestReport, PersistenceGateway, RecordSource};

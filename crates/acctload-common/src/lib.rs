//! Acctload Common Library
//!
//! Shared error handling and logging for the acctload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`AcctloadError`] type shared by configuration and
//!   document loading
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use acctload_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{AcctloadError, Result};

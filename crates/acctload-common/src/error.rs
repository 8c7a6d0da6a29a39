//! Error types shared across acctload crates

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for acctload operations
pub type Result<T> = std::result::Result<T, AcctloadError>;

/// Main error type for configuration and document handling
#[derive(Error, Debug)]
pub enum AcctloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl AcctloadError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

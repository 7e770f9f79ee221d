//! # Snapshot Store Errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for snapshot store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Snapshot store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Wrap an I/O error with the path it occurred at
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable error code for logs
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Io { .. } => "NBSTREAM_STORE_IO",
        }
    }
}

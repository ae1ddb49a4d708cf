use std::path::PathBuf;

use thiserror::Error;

/// Errors that can end the ingestion of one file.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] hoard_store::StoreError),

    #[error("index error: {0}")]
    Index(#[from] hoard_index::IndexError),

    /// An external tool could not be started or exited unsuccessfully.
    #[error("{program} failed on {path}: {reason}")]
    Tool {
        program: String,
        path: PathBuf,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;

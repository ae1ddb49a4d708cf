use hoard_backend::BackendError;
use hoard_types::Score;

/// Errors from content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No address is registered for the score.
    #[error("blob not found: {0}")]
    NotFound(Score),

    /// The backend returned a different number of bytes than the address records.
    #[error("size mismatch at {location}: expected {expected} bytes, read {actual}")]
    SizeMismatch {
        location: String,
        expected: u64,
        actual: u64,
    },

    /// I/O error while reading or staging content.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob or record backend failure.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An in-process lock was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Returns `true` if the score has no registered address.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

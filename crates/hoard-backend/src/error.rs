//! Error types for backend operations.

/// Errors from blob and record backends.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No blob exists at the given location.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A create-if-absent write found the key already taken.
    #[error("conditional write failed in {table}: {key} already exists")]
    ConditionFailed { table: String, key: String },

    /// A location string could not be parsed or belongs to another backend.
    #[error("invalid blob location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    /// A table name or blob key is not usable by this backend.
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An in-process lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl BackendError {
    /// Returns `true` for a failed create-if-absent write.
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, Self::ConditionFailed { .. })
    }
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

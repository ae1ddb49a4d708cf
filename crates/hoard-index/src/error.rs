//! Error types for index operations.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No entry has this id.
    #[error("entry not found: {id}")]
    EntryNotFound { id: String },

    /// The alias is not bound.
    #[error("alias not found: {alias}")]
    AliasNotFound { alias: String },

    /// An entry with this id already exists.
    #[error("entry already exists: {id}")]
    EntryExists { id: String },

    /// The alias is already bound to an entry.
    #[error("alias already exists: {alias}")]
    AliasExists { alias: String },

    /// An alias or relation referenced an entry that does not exist.
    #[error("referenced entry does not exist: {id}")]
    MissingEntry { id: String },

    /// Backend failure, surfaced as-is.
    #[error("backend error: {0}")]
    Backend(#[from] hoard_backend::BackendError),

    /// An in-process lock was poisoned.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl IndexError {
    /// Lookup misses: unknown entry id or unbound alias.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound { .. } | Self::AliasNotFound { .. })
    }

    /// Conditional-write collisions on entry add or alias create.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::EntryExists { .. } | Self::AliasExists { .. })
    }

    /// An alias or relation pointed at an entry that does not exist.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingEntry { .. })
    }
}

/// Convenience type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid score {value:?}: {reason}")]
    InvalidScore { value: String, reason: String },
}

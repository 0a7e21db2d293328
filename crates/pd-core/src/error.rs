//! # Errors
//!
//! Failure taxonomy shared by every store adapter and the controller.

use thiserror::Error;

/// Failures reported by a `DirectoryStore`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network, connectivity or store-side failure (e.g. DB down, HTTP 503).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store declined a write (permission or server-side validation rules).
    #[error("write rejected: {0}")]
    WriteRejected(String),
}

impl StoreError {
    pub fn unavailable(reason: impl ToString) -> Self {
        Self::Unavailable(reason.to_string())
    }

    pub fn rejected(reason: impl ToString) -> Self {
        Self::WriteRejected(reason.to_string())
    }

    /// Short machine-friendly label, used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::WriteRejected(_) => "write_rejected",
        }
    }
}

/// Caller-side input validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    #[error("comment must not be empty")]
    EmptyComment,
}

/// A specialized Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

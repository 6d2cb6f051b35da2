//! Error types for the courier-store crate.

use thiserror::Error;

/// Top-level store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional update lost its race or the row was in an unexpected
    /// state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// I/O error from a file-backed payload store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (lock poisoning, etc.).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Specialized `Result` type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("Lock poisoned: {e}"))
    }
}

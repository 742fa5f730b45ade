//! Store collaborator error types
//!
//! Every failure of the underlying engine surfaces as a `StorageError`.
//! The repository layer forwards these verbatim; it never retries.

use thiserror::Error;

/// Result type for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors reported by an ordered store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The engine refused or failed an operation
    #[error("backend failure: {0}")]
    Backend(String),

    /// The engine is closed or otherwise unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be interpreted
    #[error("corrupted value at key {key:?}: {reason}")]
    Corrupted {
        /// Key holding the value
        key: String,
        /// What was wrong with it
        reason: String,
    },
}

impl StorageError {
    /// Create a backend failure
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend(message.into())
    }

    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        StorageError::Unavailable(message.into())
    }

    /// Create a corruption error for `key`
    pub fn corrupted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::Corrupted {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::Backend(_) => "AERO_STORE_BACKEND",
            StorageError::Unavailable(_) => "AERO_STORE_UNAVAILABLE",
            StorageError::Corrupted { .. } => "AERO_STORE_CORRUPTED",
        }
    }
}

//! Repository error taxonomy
//!
//! Error codes:
//! - AERO_REPO_NOT_FOUND: update() target absent
//! - AERO_REPO_NO_INDEX: getBy() on an undeclared field
//! - AERO_REPO_STORAGE: opaque passthrough from the store
//! - AERO_REPO_VALIDATION: malformed configuration, path or key

use thiserror::Error;

use crate::store::StorageError;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by a repository handle
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    /// The addressed record does not exist
    #[error("could not find key {id}")]
    NotFound {
        /// Primary key that was looked up
        id: String,
    },

    /// getBy() was called on a field with no declared index
    #[error("could not get by {field} as no index exists")]
    NoIndex {
        /// Field path that was queried
        field: String,
    },

    /// Failure reported by the store, forwarded verbatim
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed input
    #[error("validation error: {0}")]
    Validation(String),
}

impl RepositoryError {
    /// Create a not found error for `id`
    pub fn not_found(id: impl Into<String>) -> Self {
        RepositoryError::NotFound { id: id.into() }
    }

    /// Create a no-index error for `field`
    pub fn no_index(field: impl Into<String>) -> Self {
        RepositoryError::NoIndex {
            field: field.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        RepositoryError::Validation(message.into())
    }

    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            RepositoryError::NotFound { .. } => "AERO_REPO_NOT_FOUND",
            RepositoryError::NoIndex { .. } => "AERO_REPO_NO_INDEX",
            RepositoryError::Storage(_) => "AERO_REPO_STORAGE",
            RepositoryError::Validation(_) => "AERO_REPO_VALIDATION",
        }
    }

    /// Returns true for errors that originate in the store
    pub fn is_storage(&self) -> bool {
        matches!(self, RepositoryError::Storage(_))
    }
}

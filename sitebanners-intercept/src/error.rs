//! Error taxonomy seen by repository callers.

use crate::Operation;
use sitebanners_store::StoreError;
use sitebanners_types::BannerId;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("banner with id \"{0}\" does not exist")]
    NotFound(BannerId),

    #[error("invalid banner: {0}")]
    Validation(String),

    /// A guard refused the operation before it reached the store.
    #[error(
        "cannot delete protected banner \"{title}\" (ID: {id}): banners with sort_order < {threshold} are protected (sort_order is {sort_order})"
    )]
    OperationBlocked {
        id: BannerId,
        title: String,
        sort_order: i32,
        threshold: i32,
    },

    #[error("store unavailable: {0}")]
    TransientStore(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: Operation, timeout_ms: u64 },

    #[error("{operation} was cancelled")]
    Cancelled { operation: Operation },

    #[error("interceptor '{name}' failed: {message}")]
    Interceptor { name: String, message: String },

    #[error("{operation} produced an outcome of the wrong kind")]
    UnexpectedOutcome { operation: Operation },
}

impl RepositoryError {
    /// Returns true for failures an explicit retry may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::OperationBlocked { .. })
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Unavailable(msg) => Self::TransientStore(msg),
            StoreError::Io(e) => Self::TransientStore(e.to_string()),
            StoreError::Serialization(e) => Self::Validation(e.to_string()),
        }
    }
}

//! Error types for the storage layer.

use sitebanners_types::BannerId;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Banner not found.
    #[error("banner with id \"{0}\" does not exist")]
    NotFound(BannerId),

    /// Input rejected before it reached storage.
    #[error("invalid banner: {0}")]
    Validation(String),

    /// The backing store could not serve the request right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// IO error (snapshot file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

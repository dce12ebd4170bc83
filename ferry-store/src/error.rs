//! Error types for object store operations

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur when talking to an object store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// The key cannot be mapped onto the backend
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Local I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The store answered with an error status code
    #[error("store error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message from the store
        message: String,
    },

    /// Store configuration is unusable
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    /// Check if this error means the object is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. }) || matches!(self, Self::Status { status: 404, .. })
    }
}

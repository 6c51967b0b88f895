//! Core error types.

use thiserror::Error;

/// Errors raised by the document storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying sled failure.
    #[error("storage error: {0}")]
    Sled(#[from] sled::Error),

    /// Document (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking scan task failed to complete.
    #[error("scan task failed: {0}")]
    Task(String),

    /// Stored data is not a valid document.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A write was refused before touching storage.
    #[error("{0}")]
    Rejected(String),

    /// A unique index entry is already claimed.
    #[error("{0}")]
    Conflict(String),
}

/// Errors raised while building or running a list query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The request could not be turned into a query; nothing was executed.
    #[error(transparent)]
    Invalid(#[from] murmur_proto::Error),

    /// The storage layer failed while executing the query.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QueryError {
    /// Whether the failure was caused by the request rather than storage.
    pub fn is_client_error(&self) -> bool {
        matches!(self, QueryError::Invalid(_))
    }
}

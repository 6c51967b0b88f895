//! Query IR error types.

use thiserror::Error;

/// Errors raised while turning raw query parameters into query IR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request carries a value the query layer cannot interpret
    /// (malformed pagination, unknown filter operator, bad sort spec).
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidQuery`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidQuery(msg.into())
    }
}

/// Result alias for query IR operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key path must contain at least one segment")]
    EmptyKeyPath,

    #[error("invalid path encoding: {0}")]
    InvalidPath(String),

    #[error("invalid wide integer: {0}")]
    InvalidWideInteger(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

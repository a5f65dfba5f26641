//! Cache store error types.

use thiserror::Error;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("key path must contain at least one segment")]
    EmptyKeyPath,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(chaincache_core::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store destruction blocked: {0}")]
    Blocked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<chaincache_core::Error> for CacheError {
    fn from(e: chaincache_core::Error) -> Self {
        match e {
            chaincache_core::Error::EmptyKeyPath => CacheError::EmptyKeyPath,
            other => CacheError::Core(other),
        }
    }
}

impl CacheError {
    /// Whether this error reflects a structurally invalid call rather than a store failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CacheError::EmptyKeyPath)
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

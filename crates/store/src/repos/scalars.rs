//! Scalar cell repository.

use crate::error::CacheResult;
use async_trait::async_trait;
use chaincache_core::{KeyPath, StateValue};

/// Repository for single cached values stored at the scalar sentinel index.
#[async_trait]
pub trait ScalarRepo: Send + Sync {
    /// Get the scalar cached at a key path.
    ///
    /// An empty key path is a miss, not an error.
    async fn get_scalar(&self, protocol: &str, key: &KeyPath) -> CacheResult<Option<StateValue>>;

    /// Create or overwrite the scalar at a key path.
    async fn set_scalar(&self, protocol: &str, key: &KeyPath, value: &StateValue)
    -> CacheResult<()>;
}

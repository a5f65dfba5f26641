//! Array repository.
//!
//! Arrays are stored as one row per element at indices `0..len` under the same
//! `(protocol, base_key, path_str)`. The length is never stored; it is derived
//! by scanning for the highest index, so every write path must keep the index
//! range dense.

use crate::error::CacheResult;
use async_trait::async_trait;
use chaincache_core::{KeyPath, StateValue};

/// Repository for append-only historical sequences.
#[async_trait]
pub trait ArrayRepo: Send + Sync {
    /// Derived length: highest stored index plus one, or 0.
    ///
    /// This is an O(len) scan over the element rows.
    async fn array_length(&self, protocol: &str, key: &KeyPath) -> CacheResult<u64>;

    /// Elements in `[start, end)` in index order; `end = None` reads to the tail.
    async fn array_range(
        &self,
        protocol: &str,
        key: &KeyPath,
        start: u64,
        end: Option<u64>,
    ) -> CacheResult<Vec<StateValue>>;

    /// Read the whole array.
    ///
    /// Length probe and range read run in separate transactions.
    async fn read_array(&self, protocol: &str, key: &KeyPath) -> CacheResult<Vec<StateValue>> {
        let len = self.array_length(protocol, key).await?;
        if len == 0 {
            return Ok(Vec::new());
        }
        self.array_range(protocol, key, 0, Some(len)).await
    }

    /// Append items after the current tail, in fixed-size batches.
    ///
    /// The length probe and each batch are separate transactions, so two
    /// concurrent appenders on the same path can claim the same indices.
    /// Callers must keep a single writer per key path.
    async fn append_array(
        &self,
        protocol: &str,
        key: &KeyPath,
        items: &[StateValue],
    ) -> CacheResult<()>;

    /// Replace the whole array in one transaction.
    ///
    /// Every existing element is removed first so a shorter replacement leaves
    /// no stale tail behind.
    async fn replace_array(
        &self,
        protocol: &str,
        key: &KeyPath,
        items: &[StateValue],
    ) -> CacheResult<()>;
}

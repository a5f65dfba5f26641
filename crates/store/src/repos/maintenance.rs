//! Bulk maintenance repository.

use crate::error::CacheResult;
use crate::models::{EntryFilter, EntryRow, EntrySummary};
use async_trait::async_trait;

/// Repository for scoped clears and inspection.
#[async_trait]
pub trait MaintenanceRepo: Send + Sync {
    /// Delete every entry for a `(protocol, base_key)` pair, whatever its path.
    /// Returns the number of entries removed.
    async fn clear_base_key(&self, protocol: &str, base_key: &str) -> CacheResult<u64>;

    /// Delete every entry for a protocol. Resolves once the deletion is committed.
    async fn clear_protocol(&self, protocol: &str) -> CacheResult<u64>;

    /// List decoded entries, narrowed by the filter.
    async fn list_entries(&self, filter: &EntryFilter) -> CacheResult<Vec<EntryRow>>;

    /// Entry counts grouped by `(protocol, base_key)`, sorted lexicographically.
    async fn summarize(&self) -> CacheResult<Vec<EntrySummary>>;
}

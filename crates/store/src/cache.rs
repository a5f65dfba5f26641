//! Best-effort facade over a [`CacheStore`].
//!
//! The cache sits in front of expensive network reads, so a broken or missing
//! store must never break the caller. Store failures are logged and degrade to
//! a miss (reads) or a no-op (writes). Two classes still surface as errors:
//! writes with an empty key path, and [`StateCache::delete_database`].
//!
//! Callers that want every failure should use the [`CacheStore`] directly.

use crate::error::CacheResult;
use crate::models::{EntryFilter, EntryRow, EntrySummary};
use crate::repos::{ArrayRepo, MaintenanceRepo, ScalarRepo};
use crate::store::CacheStore;
use chaincache_core::config::CacheConfig;
use chaincache_core::{KeyPath, StateValue};
use std::sync::Arc;

/// Protocol state cache with swallow-and-log error handling.
#[derive(Clone)]
pub struct StateCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl StateCache {
    /// Wrap an open store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A cache with no backing store: reads miss, writes are dropped.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// Open the configured store, falling back to a disabled cache if it cannot be opened.
    pub async fn open(config: &CacheConfig) -> Self {
        match crate::from_config(config).await {
            Ok(store) => Self::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "Protocol state cache unavailable; caching disabled");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Get the underlying store, if any.
    pub fn store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref()
    }

    /// Get the scalar cached at a key path.
    pub async fn get_cached_state(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
    ) -> Option<StateValue> {
        let key = key.into();
        let store = self.store.as_ref()?;
        degrade("get", protocol, &key, store.get_scalar(protocol, &key).await).flatten()
    }

    /// Cache a scalar at a key path.
    pub async fn set_cached_state(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
        value: impl Into<StateValue>,
    ) -> CacheResult<()> {
        let key = key.into();
        key.resolve()?;
        let Some(store) = &self.store else {
            return Ok(());
        };
        let result = store.set_scalar(protocol, &key, &value.into()).await;
        settle_write("set", protocol, &key, result)
    }

    /// Derived length of the array at a key path.
    pub async fn get_cached_array_length(&self, protocol: &str, key: impl Into<KeyPath>) -> u64 {
        let key = key.into();
        let Some(store) = &self.store else {
            return 0;
        };
        degrade("length", protocol, &key, store.array_length(protocol, &key).await)
            .unwrap_or_default()
    }

    /// Elements in `[start, end)`; `end = None` reads to the tail.
    pub async fn get_cached_array_range(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
        start: u64,
        end: Option<u64>,
    ) -> Vec<StateValue> {
        let key = key.into();
        let Some(store) = &self.store else {
            return Vec::new();
        };
        let result = store.array_range(protocol, &key, start, end).await;
        degrade("range", protocol, &key, result).unwrap_or_default()
    }

    /// The whole array at a key path.
    pub async fn read_cached_array(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
    ) -> Vec<StateValue> {
        let key = key.into();
        let Some(store) = &self.store else {
            return Vec::new();
        };
        degrade("read", protocol, &key, store.read_array(protocol, &key).await).unwrap_or_default()
    }

    /// Append items to the array at a key path.
    pub async fn append_cached_array(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
        items: &[StateValue],
    ) -> CacheResult<()> {
        let key = key.into();
        key.resolve()?;
        let Some(store) = &self.store else {
            return Ok(());
        };
        let result = store.append_array(protocol, &key, items).await;
        settle_write("append", protocol, &key, result)
    }

    /// Replace the array at a key path.
    pub async fn set_cached_array(
        &self,
        protocol: &str,
        key: impl Into<KeyPath>,
        items: &[StateValue],
    ) -> CacheResult<()> {
        let key = key.into();
        key.resolve()?;
        let Some(store) = &self.store else {
            return Ok(());
        };
        let result = store.replace_array(protocol, &key, items).await;
        settle_write("replace", protocol, &key, result)
    }

    /// Remove everything cached for one base key. Returns the number of entries removed.
    pub async fn clear_cached_state_for_base_key(&self, protocol: &str, base_key: &str) -> u64 {
        let Some(store) = &self.store else {
            return 0;
        };
        match store.clear_base_key(protocol, base_key).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(protocol, base_key, error = %e, "Failed to clear cached state");
                0
            }
        }
    }

    /// Remove everything cached for a protocol.
    pub async fn clear_cached_state(&self, protocol: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.clear_protocol(protocol).await {
            tracing::warn!(protocol, error = %e, "Failed to clear cached state");
        }
    }

    /// List cached entries, optionally narrowed by protocol and base key.
    pub async fn list_cache_entries(&self, filter: &EntryFilter) -> Vec<EntryRow> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        store.list_entries(filter).await.unwrap_or_else(|e| {
            tracing::warn!(?filter, error = %e, "Failed to list cache entries");
            Vec::new()
        })
    }

    /// Entry counts per `(protocol, base_key)`.
    pub async fn get_cache_entries_summary(&self) -> Vec<EntrySummary> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        store.summarize().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to summarize cache entries");
            Vec::new()
        })
    }

    /// Delete the whole store. Unlike every other operation, failure is returned.
    pub async fn delete_database(&self) -> CacheResult<()> {
        match &self.store {
            Some(store) => store.destroy().await,
            None => Ok(()),
        }
    }
}

fn degrade<T>(op: &str, protocol: &str, key: &KeyPath, result: CacheResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(op, protocol, key = %key, error = %e, "Cache read failed");
            None
        }
    }
}

fn settle_write(op: &str, protocol: &str, key: &KeyPath, result: CacheResult<()>) -> CacheResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_invalid_input() => Err(e),
        Err(e) => {
            tracing::warn!(op, protocol, key = %key, error = %e, "Cache write failed");
            Ok(())
        }
    }
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl From<Arc<dyn CacheStore>> for StateCache {
    fn from(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store)
    }
}

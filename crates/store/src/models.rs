//! Database models mapping to the cache schema.

use crate::error::CacheResult;
use chaincache_core::{CacheEntry, StateValue, decode_path};
use serde::Serialize;
use sqlx::FromRow;

/// Raw `cache_entries` row.
#[derive(Debug, Clone, FromRow)]
pub struct EntryRecord {
    pub protocol: String,
    pub base_key: String,
    pub path_str: String,
    pub idx: i64,
    /// Wide-integer-tagged JSON text.
    pub value: String,
}

/// A decoded cache entry as returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRow {
    pub protocol: String,
    pub base_key: String,
    /// Sub path segments after the base key.
    pub path: Vec<String>,
    pub index: i64,
    pub is_array_item: bool,
    pub value: StateValue,
}

impl EntryRow {
    /// View this row as a scalar or array element.
    pub fn entry(&self) -> CacheResult<CacheEntry> {
        Ok(CacheEntry::from_stored(self.index, self.value.clone())?)
    }
}

impl TryFrom<EntryRecord> for EntryRow {
    type Error = crate::CacheError;

    fn try_from(record: EntryRecord) -> CacheResult<Self> {
        Ok(Self {
            path: decode_path(&record.path_str)?,
            value: StateValue::decode(&record.value)?,
            is_array_item: record.idx >= 0,
            index: record.idx,
            protocol: record.protocol,
            base_key: record.base_key,
        })
    }
}

/// Optional narrowing for [`crate::repos::MaintenanceRepo::list_entries`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub protocol: Option<String>,
    pub base_key: Option<String>,
}

impl EntryFilter {
    /// Match every entry.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn base_key(mut self, base_key: impl Into<String>) -> Self {
        self.base_key = Some(base_key.into());
        self
    }
}

/// Entry count for one `(protocol, base_key)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub protocol: String,
    pub base_key: String,
    pub entry_count: u64,
}

//! Persistent cache for on-chain protocol state.
//!
//! Values fetched from contract deployments ("protocols") are cached in a
//! single SQLite table keyed by `(protocol, base_key, path_str, index)`:
//! - Scalars live at the sentinel index `-1`
//! - Arrays are dense runs of rows at `0..len`, length derived by scan
//! - Scoped clears by base key or protocol, listing and summaries
//!
//! [`StateCache`] is the best-effort entry point; [`CacheStore`] exposes the
//! same operations with every failure returned.

pub mod cache;
pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use cache::StateCache;
pub use error::{CacheError, CacheResult};
pub use models::{EntryFilter, EntryRow, EntrySummary};
pub use store::{CacheStore, SCHEMA_VERSION, SqliteStore};

use chaincache_core::config::{CacheConfig, StoreConfig};
use std::sync::Arc;

/// Create a cache store from configuration.
pub async fn from_config(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    config.validate().map_err(CacheError::Config)?;

    match &config.store {
        StoreConfig::Sqlite {
            path,
            busy_timeout_secs,
        } => {
            let store = SqliteStore::new(path, *busy_timeout_secs)
                .await?
                .with_append_batch_size(config.append_batch_size)
                .with_destroy_timeout(config.destroy_timeout());
            Ok(Arc::new(store) as Arc<dyn CacheStore>)
        }
    }
}

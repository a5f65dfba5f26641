//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Number of array elements written per append transaction.
pub const DEFAULT_APPEND_BATCH_SIZE: usize = 100;

/// Upper bound on the batch size; each element binds five SQL parameters.
pub const MAX_APPEND_BATCH_SIZE: usize = 5000;

/// Application configuration (loaded by the admin CLI).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()
    }
}

/// Protocol state cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backing store.
    #[serde(default)]
    pub store: StoreConfig,
    /// Array elements written per transaction when appending (default: 100).
    #[serde(default = "default_append_batch_size")]
    pub append_batch_size: usize,
    /// How long destroying the store may wait for open connections to drain.
    #[serde(default = "default_destroy_timeout_secs")]
    pub destroy_timeout_secs: u64,
}

fn default_append_batch_size() -> usize {
    DEFAULT_APPEND_BATCH_SIZE
}

fn default_destroy_timeout_secs() -> u64 {
    5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            append_batch_size: default_append_batch_size(),
            destroy_timeout_secs: default_destroy_timeout_secs(),
        }
    }
}

impl CacheConfig {
    /// Configuration for an in-memory store.
    ///
    /// **For testing only.** Contents vanish when the store is dropped.
    pub fn in_memory() -> Self {
        Self {
            store: StoreConfig::Sqlite {
                path: PathBuf::from(":memory:"),
                busy_timeout_secs: None,
            },
            ..Self::default()
        }
    }

    /// Get the destroy timeout as a Duration.
    pub fn destroy_timeout(&self) -> Duration {
        Duration::from_secs(self.destroy_timeout_secs)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.append_batch_size == 0 {
            return Err("cache.append_batch_size must be at least 1".to_string());
        }
        if self.append_batch_size > MAX_APPEND_BATCH_SIZE {
            return Err(format!(
                "cache.append_batch_size {} exceeds maximum {}",
                self.append_batch_size, MAX_APPEND_BATCH_SIZE
            ));
        }
        self.store.validate()
    }
}

/// Backing store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// SQLite database file, or `:memory:`.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// How long a connection waits on a locked database before failing.
        #[serde(default = "default_sqlite_busy_timeout_secs")]
        busy_timeout_secs: Option<u64>,
    },
}

fn default_sqlite_busy_timeout_secs() -> Option<u64> {
    Some(5)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/chaincache.db"),
            busy_timeout_secs: default_sqlite_busy_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Validate store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StoreConfig::Sqlite { path, .. } if path.as_os_str().is_empty() => {
                Err("sqlite store requires a non-empty 'path'".to_string())
            }
            StoreConfig::Sqlite { .. } => Ok(()),
        }
    }
}

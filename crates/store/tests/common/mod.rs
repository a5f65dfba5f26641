//! Shared test utilities for cache store integration tests.

pub mod fixtures;

use chaincache_store::{CacheResult, CacheStore, SqliteStore, StateCache};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A test cache store wrapper that cleans up on drop.
#[allow(dead_code)]
pub struct TestCache {
    pub sqlite_store: Arc<SqliteStore>,
    db_path: Option<PathBuf>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestCache {
    /// Create a new file-backed test store.
    pub async fn new() -> CacheResult<Self> {
        Self::file_backed(|store| store).await
    }

    /// Create a file-backed store with custom builder settings.
    pub async fn file_backed(
        configure: impl FnOnce(SqliteStore) -> SqliteStore,
    ) -> CacheResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("cache.db");
        let store = configure(SqliteStore::new(&db_path, None).await?);

        Ok(Self {
            sqlite_store: Arc::new(store),
            db_path: Some(db_path),
            _temp_dir: temp_dir,
        })
    }

    /// Create a new in-memory store (faster for tests).
    pub async fn in_memory() -> CacheResult<Self> {
        Self::in_memory_with(|store| store).await
    }

    /// Create an in-memory store with custom builder settings.
    pub async fn in_memory_with(
        configure: impl FnOnce(SqliteStore) -> SqliteStore,
    ) -> CacheResult<Self> {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let store = configure(SqliteStore::new(":memory:", None).await?);

        Ok(Self {
            sqlite_store: Arc::new(store),
            db_path: None,
            _temp_dir: temp_dir,
        })
    }

    /// Get the store behind the repository traits.
    pub fn store(&self) -> Arc<dyn CacheStore> {
        self.sqlite_store.clone()
    }

    /// Get a best-effort facade over this store.
    pub fn cache(&self) -> StateCache {
        StateCache::new(self.store())
    }

    /// Get a reference to the SQLite connection pool for raw queries.
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.sqlite_store.pool()
    }

    /// Database file path for file-backed stores.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Count raw rows for one logical path.
    pub async fn count_rows(&self, protocol: &str, base_key: &str, path_str: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM cache_entries WHERE protocol = ? AND base_key = ? AND path_str = ?",
        )
        .bind(protocol)
        .bind(base_key)
        .bind(path_str)
        .fetch_one(self.pool())
        .await
        .expect("count query failed")
    }
}

/// Short destroy timeout for blocked-destroy tests.
#[allow(dead_code)]
pub const SHORT_DESTROY_TIMEOUT: Duration = Duration::from_millis(200);

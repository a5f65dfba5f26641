//! Cache store trait and the SQLite implementation.

use crate::error::{CacheError, CacheResult};
use crate::repos::{ArrayRepo, MaintenanceRepo, ScalarRepo};
use async_trait::async_trait;
use chaincache_core::config::{DEFAULT_APPEND_BATCH_SIZE, MAX_APPEND_BATCH_SIZE};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Current on-disk schema version, kept in `PRAGMA user_version`.
///
/// Opening a database written at any other version drops every cached entry.
pub const SCHEMA_VERSION: i64 = 1;

/// Combined cache store trait.
#[async_trait]
pub trait CacheStore: ScalarRepo + ArrayRepo + MaintenanceRepo + Send + Sync {
    /// Create the schema, or drop and recreate it if it was written at another version.
    async fn migrate(&self) -> CacheResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> CacheResult<()>;

    /// Delete the whole store, not just its rows.
    ///
    /// Fails with [`CacheError::Blocked`] if open connections do not drain in time.
    async fn destroy(&self) -> CacheResult<()>;
}

/// SQLite-based cache store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    /// Database file; `None` for in-memory stores.
    path: Option<PathBuf>,
    append_batch_size: usize,
    destroy_timeout: Duration,
}

impl SqliteStore {
    /// Open (or create) a SQLite store and bring its schema up to date.
    ///
    /// `":memory:"` opens a private in-memory store.
    pub async fn new(path: impl AsRef<Path>, busy_timeout_secs: Option<u64>) -> CacheResult<Self> {
        let path = path.as_ref();
        let in_memory = path == Path::new(":memory:");

        if !in_memory {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(busy_timeout_secs.unwrap_or(5)));

        let pool = SqlitePoolOptions::new()
            // One connection: SQLite serializes writers anyway, and an in-memory
            // database lives only as long as its connection.
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        let store = Self {
            pool,
            path: (!in_memory).then(|| path.to_path_buf()),
            append_batch_size: DEFAULT_APPEND_BATCH_SIZE,
            destroy_timeout: Duration::from_secs(5),
        };
        store.migrate().await?;

        tracing::info!(
            path = %path.display(),
            schema_version = SCHEMA_VERSION,
            "Opened protocol state cache"
        );

        Ok(store)
    }

    /// Set the number of elements written per append transaction.
    ///
    /// Clamped to `1..=MAX_APPEND_BATCH_SIZE` so one multi-row insert stays
    /// under SQLite's bound-parameter limit.
    pub fn with_append_batch_size(mut self, batch_size: usize) -> Self {
        self.append_batch_size = batch_size.clamp(1, MAX_APPEND_BATCH_SIZE);
        self
    }

    /// Set how long [`CacheStore::destroy`] waits for connections to drain.
    pub fn with_destroy_timeout(mut self, timeout: Duration) -> Self {
        self.destroy_timeout = timeout;
        self
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Database file path, if the store is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn append_batch_size(&self) -> usize {
        self.append_batch_size
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn migrate(&self) -> CacheResult<()> {
        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await?;

        if version != 0 && version != SCHEMA_VERSION {
            // The key layout cannot be translated between versions; start over.
            let table_exists: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='cache_entries')",
            )
            .fetch_one(&mut *tx)
            .await?;

            let discarded: i64 = if table_exists {
                sqlx::query_scalar("SELECT COUNT(*) FROM cache_entries")
                    .fetch_one(&mut *tx)
                    .await?
            } else {
                0
            };

            tracing::warn!(
                from_version = version,
                to_version = SCHEMA_VERSION,
                discarded_entries = discarded,
                "Incompatible cache schema detected; dropping all cached entries"
            );

            sqlx::query("DROP TABLE IF EXISTS cache_entries")
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(SCHEMA_SQL).execute(&mut *tx).await?;

        let set_version = format!("PRAGMA user_version = {SCHEMA_VERSION}");
        sqlx::query(&set_version).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn destroy(&self) -> CacheResult<()> {
        if tokio::time::timeout(self.destroy_timeout, self.pool.close())
            .await
            .is_err()
        {
            return Err(CacheError::Blocked(format!(
                "{} connection(s) still in use after {:?}",
                self.pool.size(),
                self.destroy_timeout
            )));
        }

        if let Some(path) = &self.path {
            for file in [path.clone(), sibling(path, "-wal"), sibling(path, "-shm")] {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        tracing::info!(
            path = ?self.path,
            "Destroyed protocol state cache"
        );
        Ok(())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::*;
    use chaincache_core::{KeyPath, MAX_INDEX, ResolvedKey, StateValue};
    use futures::TryStreamExt;
    use sqlx::{QueryBuilder, SqliteConnection};

    /// Resolve a key path for a read; an empty path is a miss.
    fn resolve_for_read(key: &KeyPath) -> CacheResult<Option<ResolvedKey>> {
        if key.is_empty() {
            return Ok(None);
        }
        Ok(Some(key.resolve()?))
    }

    fn encode_all(items: &[StateValue]) -> CacheResult<Vec<String>> {
        Ok(items
            .iter()
            .map(StateValue::encode)
            .collect::<chaincache_core::Result<_>>()?)
    }

    fn to_index(index: u64) -> CacheResult<i64> {
        i64::try_from(index)
            .map_err(|_| CacheError::Internal(format!("array index {index} exceeds {MAX_INDEX}")))
    }

    /// Scan the element rows of one array and derive its length.
    async fn scan_length(
        conn: &mut SqliteConnection,
        protocol: &str,
        key: &ResolvedKey,
    ) -> CacheResult<u64> {
        let mut indices = sqlx::query_scalar::<_, i64>(
            "SELECT idx FROM cache_entries \
             WHERE protocol = ? AND base_key = ? AND path_str = ? AND idx BETWEEN 0 AND ?",
        )
        .bind(protocol)
        .bind(key.base_key())
        .bind(key.path_str())
        .bind(MAX_INDEX)
        .fetch(conn);

        let mut max_index: Option<i64> = None;
        while let Some(idx) = indices.try_next().await? {
            max_index = Some(max_index.map_or(idx, |max| max.max(idx)));
        }
        Ok(max_index.map_or(0, |max| max as u64 + 1))
    }

    /// Write encoded values at consecutive indices starting at `first_index`.
    async fn insert_elements(
        conn: &mut SqliteConnection,
        protocol: &str,
        key: &ResolvedKey,
        first_index: u64,
        values: &[String],
    ) -> CacheResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        let first = to_index(first_index)?;
        // Reject before binding so a batch never wraps past MAX_INDEX.
        to_index(first_index + values.len() as u64 - 1)?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT OR REPLACE INTO cache_entries (protocol, base_key, path_str, idx, value) ",
        );
        builder.push_values(values.iter().enumerate(), |mut row, (offset, value)| {
            row.push_bind(protocol.to_string())
                .push_bind(key.base_key().to_string())
                .push_bind(key.path_str().to_string())
                .push_bind(first + offset as i64)
                .push_bind(value.clone());
        });
        builder.build().execute(conn).await?;
        Ok(())
    }

    #[async_trait]
    impl ScalarRepo for SqliteStore {
        async fn get_scalar(
            &self,
            protocol: &str,
            key: &KeyPath,
        ) -> CacheResult<Option<StateValue>> {
            let Some(resolved) = resolve_for_read(key)? else {
                return Ok(None);
            };
            let scalar = resolved.scalar_key(protocol);

            let mut tx = self.pool.begin().await?;
            let row: Option<(String,)> = sqlx::query_as(
                "SELECT value FROM cache_entries \
                 WHERE protocol = ? AND base_key = ? AND path_str = ? AND idx = ?",
            )
            .bind(&scalar.protocol)
            .bind(&scalar.base_key)
            .bind(&scalar.path_str)
            .bind(scalar.index)
            .fetch_optional(&mut *tx)
            .await?;
            tx.commit().await?;

            match row {
                Some((text,)) => Ok(Some(StateValue::decode(&text)?)),
                None => Ok(None),
            }
        }

        async fn set_scalar(
            &self,
            protocol: &str,
            key: &KeyPath,
            value: &StateValue,
        ) -> CacheResult<()> {
            let scalar = key.resolve()?.scalar_key(protocol);
            let encoded = value.encode()?;

            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO cache_entries (protocol, base_key, path_str, idx, value)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (protocol, base_key, path_str, idx) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(&scalar.protocol)
            .bind(&scalar.base_key)
            .bind(&scalar.path_str)
            .bind(scalar.index)
            .bind(&encoded)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            tracing::debug!(protocol, key = %key, "Cached scalar");
            Ok(())
        }
    }

    #[async_trait]
    impl ArrayRepo for SqliteStore {
        async fn array_length(&self, protocol: &str, key: &KeyPath) -> CacheResult<u64> {
            let Some(resolved) = resolve_for_read(key)? else {
                return Ok(0);
            };

            let mut tx = self.pool.begin().await?;
            let len = scan_length(&mut tx, protocol, &resolved).await?;
            tx.commit().await?;
            Ok(len)
        }

        async fn array_range(
            &self,
            protocol: &str,
            key: &KeyPath,
            start: u64,
            end: Option<u64>,
        ) -> CacheResult<Vec<StateValue>> {
            let Some(resolved) = resolve_for_read(key)? else {
                return Ok(Vec::new());
            };
            let Ok(low) = i64::try_from(start) else {
                return Ok(Vec::new());
            };
            let high = match end {
                Some(end) if end <= start => return Ok(Vec::new()),
                Some(end) => i64::try_from(end - 1).unwrap_or(MAX_INDEX),
                None => MAX_INDEX,
            };

            let mut tx = self.pool.begin().await?;
            let mut rows: Vec<(i64, String)> = sqlx::query_as(
                "SELECT idx, value FROM cache_entries \
                 WHERE protocol = ? AND base_key = ? AND path_str = ? AND idx BETWEEN ? AND ?",
            )
            .bind(protocol)
            .bind(resolved.base_key())
            .bind(resolved.path_str())
            .bind(low)
            .bind(high)
            .fetch_all(&mut *tx)
            .await?;
            tx.commit().await?;

            // No ORDER BY: index order is restored here.
            rows.sort_unstable_by_key(|(idx, _)| *idx);
            rows.iter()
                .map(|(_, text)| StateValue::decode(text).map_err(CacheError::from))
                .collect()
        }

        async fn append_array(
            &self,
            protocol: &str,
            key: &KeyPath,
            items: &[StateValue],
        ) -> CacheResult<()> {
            if items.is_empty() {
                return Ok(());
            }
            let resolved = key.resolve()?;
            let encoded = encode_all(items)?;

            let mut next_index = self.array_length(protocol, key).await?;
            for batch in encoded.chunks(self.append_batch_size) {
                let mut tx = self.pool.begin().await?;
                insert_elements(&mut tx, protocol, &resolved, next_index, batch).await?;
                tx.commit().await?;
                next_index += batch.len() as u64;
            }

            tracing::debug!(
                protocol,
                key = %key,
                appended = items.len(),
                len = next_index,
                "Appended to cached array"
            );
            Ok(())
        }

        async fn replace_array(
            &self,
            protocol: &str,
            key: &KeyPath,
            items: &[StateValue],
        ) -> CacheResult<()> {
            let resolved = key.resolve()?;
            let encoded = encode_all(items)?;

            let mut tx = self.pool.begin().await?;
            let removed = sqlx::query(
                "DELETE FROM cache_entries \
                 WHERE protocol = ? AND base_key = ? AND path_str = ? AND idx BETWEEN 0 AND ?",
            )
            .bind(protocol)
            .bind(resolved.base_key())
            .bind(resolved.path_str())
            .bind(MAX_INDEX)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let mut next_index = 0u64;
            for chunk in encoded.chunks(self.append_batch_size) {
                insert_elements(&mut tx, protocol, &resolved, next_index, chunk).await?;
                next_index += chunk.len() as u64;
            }
            tx.commit().await?;

            tracing::debug!(
                protocol,
                key = %key,
                removed,
                len = next_index,
                "Replaced cached array"
            );
            Ok(())
        }
    }

    #[async_trait]
    impl MaintenanceRepo for SqliteStore {
        async fn clear_base_key(&self, protocol: &str, base_key: &str) -> CacheResult<u64> {
            let mut tx = self.pool.begin().await?;
            let removed = sqlx::query("DELETE FROM cache_entries WHERE protocol = ? AND base_key = ?")
                .bind(protocol)
                .bind(base_key)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tx.commit().await?;

            tracing::debug!(protocol, base_key, removed, "Cleared cached state for base key");
            Ok(removed)
        }

        async fn clear_protocol(&self, protocol: &str) -> CacheResult<u64> {
            let mut tx = self.pool.begin().await?;
            let removed = sqlx::query("DELETE FROM cache_entries WHERE protocol = ?")
                .bind(protocol)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tx.commit().await?;

            tracing::debug!(protocol, removed, "Cleared cached state for protocol");
            Ok(removed)
        }

        async fn list_entries(&self, filter: &EntryFilter) -> CacheResult<Vec<EntryRow>> {
            let mut tx = self.pool.begin().await?;
            let records = match (filter.protocol.as_deref(), filter.base_key.as_deref()) {
                (Some(protocol), Some(base_key)) => {
                    sqlx::query_as::<_, EntryRecord>(
                        "SELECT * FROM cache_entries WHERE protocol = ? AND base_key = ? \
                         ORDER BY path_str, idx",
                    )
                    .bind(protocol)
                    .bind(base_key)
                    .fetch_all(&mut *tx)
                    .await?
                }
                (Some(protocol), None) => {
                    sqlx::query_as::<_, EntryRecord>(
                        "SELECT * FROM cache_entries WHERE protocol = ? \
                         ORDER BY base_key, path_str, idx",
                    )
                    .bind(protocol)
                    .fetch_all(&mut *tx)
                    .await?
                }
                (None, _) => {
                    sqlx::query_as::<_, EntryRecord>(
                        "SELECT * FROM cache_entries ORDER BY protocol, base_key, path_str, idx",
                    )
                    .fetch_all(&mut *tx)
                    .await?
                }
            };
            tx.commit().await?;

            records
                .into_iter()
                .filter(|record| {
                    filter
                        .base_key
                        .as_deref()
                        .is_none_or(|base_key| record.base_key == base_key)
                })
                .map(EntryRow::try_from)
                .collect()
        }

        async fn summarize(&self) -> CacheResult<Vec<EntrySummary>> {
            let mut tx = self.pool.begin().await?;
            let rows: Vec<(String, String, i64)> = sqlx::query_as(
                "SELECT protocol, base_key, COUNT(*) FROM cache_entries \
                 GROUP BY protocol, base_key ORDER BY protocol, base_key",
            )
            .fetch_all(&mut *tx)
            .await?;
            tx.commit().await?;

            Ok(rows
                .into_iter()
                .map(|(protocol, base_key, count)| EntrySummary {
                    protocol,
                    base_key,
                    entry_count: count as u64,
                })
                .collect())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- One row per scalar (idx = -1) or array element (idx >= 0)
CREATE TABLE IF NOT EXISTS cache_entries (
    protocol TEXT NOT NULL,
    base_key TEXT NOT NULL,
    path_str TEXT NOT NULL,
    idx INTEGER NOT NULL CHECK (idx >= -1),
    value TEXT NOT NULL,
    PRIMARY KEY (protocol, base_key, path_str, idx)
);
CREATE INDEX IF NOT EXISTS idx_cache_entries_protocol ON cache_entries(protocol);
CREATE INDEX IF NOT EXISTS idx_cache_entries_base_key ON cache_entries(protocol, base_key);
"#;

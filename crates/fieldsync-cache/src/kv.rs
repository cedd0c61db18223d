//! SQLite implementation of the key-value store port
//!
//! One `kv_entries` table holds every persisted blob. Values are opaque
//! strings to this layer; the cache and interview store serialize JSON into
//! them.
//!
//! The store owns its connection pool. WAL journaling keeps status reads
//! from blocking behind a sync pass rewriting blobs, and the busy timeout
//! covers the worst-case blob rewrite. Blob writes are whole-row
//! replacements, so a handful of connections is plenty.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use fieldsync_core::ports::IKeyValueStore;

use crate::StoreError;

const SCHEMA_SQL: &str = include_str!("migrations/20260815_initial.sql");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 4;

/// SQLite-backed implementation of the key-value store port
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    /// Opens the store at `db_path`, creating the file, its parent
    /// directories, and the schema as needed
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Cannot create {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("{}: {e}", db_path.display()))
            })?;

        let store = Self::with_schema(pool).await?;
        tracing::info!(path = %db_path.display(), "Opened key-value store");
        Ok(store)
    }

    /// Opens an in-memory store for tests
    ///
    /// Capped at one connection: an in-memory SQLite database vanishes with
    /// its connection, so a second one would see an empty database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::with_schema(pool).await
    }

    async fn with_schema(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO kv_entries (key, value, updated_at) \
             VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(key, "Stored value");
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::trace!(key, "Removed key");
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> anyhow::Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("DELETE FROM kv_entries WHERE key IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(*key);
        }
        query.execute(&self.pool).await?;

        tracing::trace!(count = keys.len(), "Removed keys");
        Ok(())
    }
}

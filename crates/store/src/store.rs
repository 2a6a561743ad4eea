// ABOUTME: SQLite-backed CacheStore for extracted image collections.
// ABOUTME: Insert-or-ignore keyed on canonical URL, insertion-ordered listing, and the single cached/local_path flip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{FromRow, SqlitePool};

use crate::entry::{CacheEntry, PutOutcome, StoredCollection};
use crate::error::StoreError;
use crate::location::DB_FILE_NAME;

/// Schema for the cache database. Every statement is idempotent so opening an
/// existing store never touches its rows.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    source_url TEXT NOT NULL,
    canonical_url TEXT NOT NULL UNIQUE,
    cached INTEGER NOT NULL DEFAULT 0,
    local_path TEXT,
    created_at TEXT NOT NULL,
    CHECK ((cached <> 0) = (local_path IS NOT NULL))
);

-- Ordered asset URLs of each collection
CREATE TABLE IF NOT EXISTS entry_assets (
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    asset_url TEXT NOT NULL,
    PRIMARY KEY (entry_id, position)
);
"#;

const SELECT_ENTRY_COLUMNS: &str =
    "SELECT id, title, source_url, canonical_url, cached, local_path, created_at FROM entries";

#[derive(Debug, FromRow)]
struct EntryRow {
    id: i64,
    title: String,
    source_url: String,
    canonical_url: String,
    cached: bool,
    local_path: Option<String>,
    created_at: String,
}

impl EntryRow {
    fn into_collection(self, assets: Vec<String>) -> Result<StoredCollection, StoreError> {
        if self.cached != self.local_path.is_some() {
            return Err(StoreError::corrupt(format!(
                "entry {} has cached={} but local_path={:?}",
                self.id, self.cached, self.local_path
            )));
        }

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::corrupt(format!("entry {}: invalid date: {}", self.id, e)))?
            .with_timezone(&Utc);

        Ok(StoredCollection {
            id: self.id,
            title: self.title,
            source_url: self.source_url,
            canonical_url: self.canonical_url,
            cached: self.cached,
            local_path: self.local_path,
            created_at,
            assets,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssetRow {
    entry_id: i64,
    asset_url: String,
}

/// Durable mapping from canonical page URL to a stored collection.
///
/// Cloning is cheap and clones share one connection pool, so a single store
/// can be handed to every concurrent extraction.
#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl CacheStore {
    /// Open or create the store inside `dir` (created if missing).
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(dir).await?;
        Self::open_at(&dir.join(DB_FILE_NAME)).await
    }

    /// Open or create the store at an explicit database file path.
    pub async fn open_at(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::open(path.display().to_string(), e))?;

        let store = Self {
            pool,
            path: Some(path.to_path_buf()),
        };
        store.init_schema().await?;
        tracing::debug!(path = %path.display(), "cache store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    ///
    /// Each SQLite memory connection is its own database, so the pool is pinned
    /// to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::open(":memory:", e))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::open(":memory:", e))?;

        let store = Self { pool, path: None };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::open(self.describe(), e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string())
    }

    /// Path of the backing database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert an entry with no assets. See [`CacheStore::put_collection`].
    pub async fn put(&self, entry: &CacheEntry) -> Result<PutOutcome, StoreError> {
        self.put_collection(entry, &[]).await
    }

    /// Insert an entry and its ordered assets unless the canonical URL is
    /// already present.
    ///
    /// The existence check and the insert are one statement, so concurrent
    /// callers racing on the same canonical URL produce exactly one row. The
    /// asset rows are written in the same transaction and only for a new entry.
    pub async fn put_collection(
        &self,
        entry: &CacheEntry,
        assets: &[String],
    ) -> Result<PutOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO entries (title, source_url, canonical_url, cached, local_path, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(canonical_url) DO NOTHING",
        )
        .bind(&entry.title)
        .bind(&entry.source_url)
        .bind(&entry.canonical_url)
        .bind(entry.cached())
        .bind(entry.local_path())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            tracing::info!(canonical_url = %entry.canonical_url, "collection already cached");
            return Ok(PutOutcome::Duplicate);
        }

        let id = result.last_insert_rowid();
        for (position, asset_url) in assets.iter().enumerate() {
            sqlx::query("INSERT INTO entry_assets (entry_id, position, asset_url) VALUES (?, ?, ?)")
                .bind(id)
                .bind(position as i64)
                .bind(asset_url)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            canonical_url = %entry.canonical_url,
            id,
            assets = assets.len(),
            "collection cached"
        );
        Ok(PutOutcome::Inserted { id })
    }

    /// All stored collections in insertion order.
    ///
    /// Entries and assets are read inside one transaction, so a concurrent
    /// writer is either fully visible or not at all.
    pub async fn list_all(&self) -> Result<Vec<StoredCollection>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<EntryRow> = sqlx::query_as(&format!("{SELECT_ENTRY_COLUMNS} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await?;

        let asset_rows: Vec<AssetRow> = sqlx::query_as(
            "SELECT entry_id, asset_url FROM entry_assets ORDER BY entry_id, position",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut assets_by_entry: HashMap<i64, Vec<String>> = HashMap::new();
        for row in asset_rows {
            assets_by_entry
                .entry(row.entry_id)
                .or_default()
                .push(row.asset_url);
        }

        rows.into_iter()
            .map(|row| {
                let assets = assets_by_entry.remove(&row.id).unwrap_or_default();
                row.into_collection(assets)
            })
            .collect()
    }

    /// Look up one collection by canonical URL.
    pub async fn get(&self, canonical_url: &str) -> Result<Option<StoredCollection>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<EntryRow> =
            sqlx::query_as(&format!("{SELECT_ENTRY_COLUMNS} WHERE canonical_url = ?"))
                .bind(canonical_url)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let assets: Vec<(String,)> = sqlx::query_as(
            "SELECT asset_url FROM entry_assets WHERE entry_id = ? ORDER BY position",
        )
        .bind(row.id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_collection(assets.into_iter().map(|(url,)| url).collect())
            .map(Some)
    }

    /// Record that a local copy of the collection now exists at `local_path`.
    ///
    /// This is the only mutation an existing row ever sees. Returns false if no
    /// entry has that canonical URL.
    pub async fn mark_cached(
        &self,
        canonical_url: &str,
        local_path: &str,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE entries SET cached = 1, local_path = ? WHERE canonical_url = ?")
                .bind(local_path)
                .bind(canonical_url)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of stored collections.
    pub async fn len(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Returns true if nothing has been stored yet.
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    /// Close the pool, waiting for connections to be released.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

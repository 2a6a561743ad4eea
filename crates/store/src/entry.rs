// ABOUTME: Cache entry data models: CacheEntry for writes, StoredCollection for reads, PutOutcome.
// ABOUTME: CacheEntry keeps `cached` derived from `local_path` so the two can never disagree.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A collection record to be written to the store.
///
/// `cached` is not a field: it is true exactly when a local path is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub title: String,
    pub canonical_url: String,
    pub source_url: String,
    local_path: Option<String>,
}

impl CacheEntry {
    /// Creates an entry with no local copy.
    pub fn new(
        title: impl Into<String>,
        canonical_url: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            canonical_url: canonical_url.into(),
            source_url: source_url.into(),
            local_path: None,
        }
    }

    /// Marks the entry as materialized at `path`.
    pub fn with_local_path(mut self, path: impl Into<String>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Returns true if a local copy exists.
    pub fn cached(&self) -> bool {
        self.local_path.is_some()
    }

    /// Returns the local copy path, if any.
    pub fn local_path(&self) -> Option<&str> {
        self.local_path.as_deref()
    }
}

/// Outcome of inserting a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// A new row was written with the given id.
    Inserted { id: i64 },
    /// A row with the same canonical URL already existed and was left untouched.
    Duplicate,
}

impl PutOutcome {
    /// Returns true if the insert was ignored as a duplicate.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PutOutcome::Duplicate)
    }
}

/// A collection as read back from the store, with its ordered assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredCollection {
    pub id: i64,
    pub title: String,
    pub source_url: String,
    pub canonical_url: String,
    pub cached: bool,
    pub local_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<String>,
}

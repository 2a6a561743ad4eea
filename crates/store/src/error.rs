// ABOUTME: Error type for cache store operations.
// ABOUTME: Provides StoreError with Open, Io, Query, and Corrupt variants.

use thiserror::Error;

/// Errors raised by the cache store.
///
/// None of these are fatal to an extraction: callers treat a failed write as
/// "persistence skipped" and still hand the extracted collection to the user.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing database could not be opened or its schema created.
    #[error("failed to open cache store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: sqlx::Error,
    },

    /// Filesystem failure while preparing the store directory.
    #[error("cache store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A read or write against an open store failed.
    #[error("cache store query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A stored row violates the entry invariants.
    #[error("corrupt cache row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Creates an Open error for the given database path.
    pub fn open(path: impl Into<String>, source: sqlx::Error) -> Self {
        StoreError::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a Corrupt error with a custom message.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        StoreError::Corrupt(msg.into())
    }
}

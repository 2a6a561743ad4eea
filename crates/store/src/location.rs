// ABOUTME: Resolves where the cache database lives on disk.
// ABOUTME: Explicit directory first, then the platform data directory, then the working directory.

use std::path::{Path, PathBuf};

/// File name of the SQLite database inside the store directory.
pub const DB_FILE_NAME: &str = "sift-cache.sqlite";

const APP_DIR_NAME: &str = "sift";

/// Returns the default store directory.
///
/// Uses the platform's local data directory (e.g. `~/.local/share/sift`),
/// falling back to the current working directory when that is unavailable.
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `explicit` when given, otherwise [`default_store_dir`].
pub fn resolve_store_dir(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => default_store_dir(),
    }
}

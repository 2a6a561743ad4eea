// ABOUTME: Library entry point for the sift cache store.
// ABOUTME: Re-exports CacheStore, CacheEntry, StoredCollection, PutOutcome, StoreError and location helpers.

//! Durable record of previously extracted image collections.
//!
//! Collections are keyed by the canonical URL of the page they were extracted
//! from. Inserts are first-writer-wins: a second insert of the same canonical
//! URL reports [`PutOutcome::Duplicate`] and leaves the stored row untouched.
//!
//! # Example
//!
//! ```no_run
//! use sift_store::{CacheEntry, CacheStore, PutOutcome, StoreError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StoreError> {
//!     let store = CacheStore::open(&sift_store::default_store_dir()).await?;
//!     let entry = CacheEntry::new(
//!         "Chapter 1",
//!         "https://site.example/chapter/1",
//!         "https://site.example/chapter/1#top",
//!     );
//!     let assets = vec!["https://cdn.example.com/1.jpg".to_string()];
//!     if let PutOutcome::Duplicate = store.put_collection(&entry, &assets).await? {
//!         println!("already cached");
//!     }
//!     Ok(())
//! }
//! ```

pub mod entry;
pub mod error;
pub mod location;
pub mod store;

pub use crate::entry::{CacheEntry, PutOutcome, StoredCollection};
pub use crate::error::StoreError;
pub use crate::location::{default_store_dir, resolve_store_dir, DB_FILE_NAME};
pub use crate::store::CacheStore;

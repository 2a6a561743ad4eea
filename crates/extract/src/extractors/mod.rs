// ABOUTME: Asset extraction stages: candidate collection, URL normalization, denylist filtering, and title lookup.
// ABOUTME: Each stage preserves document order; none of them reorder.

//! Extraction stages that run after a content region has been located.
//!
//! Submodules:
//! - `assets`: walks image-bearing elements and resolves attribute precedence.
//! - `filter`: drops denylisted and non-extractable candidates.
//! - `urls`: canonical forms for asset and page URLs.
//! - `title`: collection title for cache entries.

pub mod assets;
pub mod filter;
pub mod title;
pub mod urls;

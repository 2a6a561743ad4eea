// ABOUTME: Extraction result types: the successful Extraction record and its persistence status.
// ABOUTME: ExtractionResult is the only value the pipeline ever hands to a presentation layer.

use serde::Serialize;
use sift_store::CacheEntry;

use crate::error::ExtractError;
use crate::extractors::urls::CanonicalAssetUrl;

/// What happened when the pipeline tried to cache a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum PersistStatus {
    /// No store was supplied.
    NotRequested,
    Inserted,
    /// The canonical URL was already cached; the stored row was left as is.
    Duplicate,
    /// The store could not be written. The extraction itself still succeeded.
    Failed(String),
}

/// A successful extraction: the ordered asset URLs of one page.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// The URL the caller asked for.
    pub source_url: String,
    /// The URL the document was served from after redirects.
    pub final_url: String,
    /// Cache key for this collection.
    pub canonical_url: String,
    pub title: String,
    /// Index of the region selector that located the content, `None` for the whole-document fallback.
    pub region_matched: Option<usize>,
    /// Image candidates seen before filtering.
    pub candidate_count: usize,
    /// Filtered, canonical asset URLs in document order. Never empty.
    pub assets: Vec<CanonicalAssetUrl>,
    pub persisted: PersistStatus,
}

/// Outcome of one pipeline invocation.
pub type ExtractionResult = Result<Extraction, ExtractError>;

impl Extraction {
    /// Asset URLs as plain strings, in order.
    pub fn asset_urls(&self) -> Vec<String> {
        self.assets.iter().map(|u| u.as_str().to_string()).collect()
    }

    /// The cache record for this collection.
    pub fn to_cache_entry(&self) -> CacheEntry {
        CacheEntry::new(&self.title, &self.canonical_url, &self.source_url)
    }
}

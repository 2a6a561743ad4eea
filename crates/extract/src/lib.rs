// ABOUTME: Main library entry point for the sift image-collection extractor.
// ABOUTME: Re-exports the public API: Pipeline, PipelineBuilder, PipelineConfig, Extraction, ExtractError, ErrorKind.

//! Sift - recovers the ordered image assets embedded in a noisy web page.
//!
//! A [`Pipeline`] fetches a page, parses it, locates the reading area, walks
//! its images in document order, drops advertising and iconographic noise,
//! and returns the surviving absolute URLs. Failures are typed so a caller can
//! tell "the page could not be loaded" from "the page has no content".
//!
//! # Example
//!
//! ```no_run
//! use sift_extract::{ExtractError, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ExtractError> {
//!     let pipeline = Pipeline::builder().build()?;
//!     let extraction = pipeline.extract("https://site.example/chapter/1").await?;
//!     for url in &extraction.assets {
//!         println!("{url}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod dom;
pub mod error;
pub mod extractors;
pub mod options;
pub mod pipeline;
pub mod resource;
pub mod result;
pub mod supersede;

pub use crate::error::{ErrorKind, ExtractError};
pub use crate::extractors::assets::{AssetExtractor, AttributeKind, ImageCandidate};
pub use crate::extractors::filter::AssetFilter;
pub use crate::extractors::urls::{canonical_page_url, normalize_asset_url, CanonicalAssetUrl};
pub use crate::options::{HeaderProfile, PipelineBuilder, PipelineConfig, RegionSelector};
pub use crate::pipeline::{Pipeline, Stage};
pub use crate::result::{Extraction, ExtractionResult, PersistStatus};
pub use crate::supersede::{RequestTicket, ViewRequests};

// ABOUTME: The Pipeline: runs Fetch, Parse, Locate, Extract, Filter and optional Persist for one page.
// ABOUTME: Short-circuits on the first failing stage and returns a typed ExtractionResult, never a partial list.

use scraper::Html;
use sift_store::{CacheStore, PutOutcome};
use tokio_util::sync::CancellationToken;

use crate::dom::locate::ContentLocator;
use crate::dom::{self, ParsedDocument};
use crate::error::{ErrorKind, ExtractError};
use crate::extractors::assets::AssetExtractor;
use crate::extractors::filter::AssetFilter;
use crate::extractors::title::extract_title;
use crate::extractors::urls::canonical_page_url;
use crate::options::{PipelineBuilder, PipelineConfig};
use crate::resource::{self, build_http_client, SourceRequest};
use crate::result::{Extraction, ExtractionResult, PersistStatus};
use crate::supersede::ViewRequests;

/// Where an invocation is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Parsing,
    Locating,
    Extracting,
    Filtering,
    Persisting,
    Done,
    Failed(ErrorKind),
}

impl Stage {
    /// The operation name recorded in errors raised during this stage.
    pub fn op(&self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Fetching => "Fetch",
            Stage::Parsing => "Parse",
            Stage::Locating => "Locate",
            Stage::Extracting => "Extract",
            Stage::Filtering => "Filter",
            Stage::Persisting => "Persist",
            Stage::Done => "Done",
            Stage::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed(_))
    }
}

/// Logs stage transitions for one invocation.
struct StageTrace<'a> {
    url: &'a str,
    stage: Stage,
}

impl<'a> StageTrace<'a> {
    fn new(url: &'a str) -> Self {
        Self {
            url,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, next: Stage) {
        tracing::debug!(url = %self.url, from = ?self.stage, to = ?next, "stage");
        self.stage = next;
    }

    fn fail(&mut self, err: ExtractError) -> ExtractError {
        tracing::debug!(url = %self.url, stage = ?self.stage, error = %err, "stage failed");
        self.stage = Stage::Failed(err.kind);
        err
    }
}

/// A configured extraction pipeline.
///
/// Selectors and the denylist are compiled once at build time; the HTTP
/// client and its connection pool are shared by every invocation.
pub struct Pipeline {
    config: PipelineConfig,
    http_client: reqwest::Client,
    locator: ContentLocator,
    extractor: AssetExtractor,
    filter: AssetFilter,
}

impl Pipeline {
    /// Create a new PipelineBuilder for configuring the pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Build a pipeline from a configuration.
    pub fn new(config: PipelineConfig) -> Result<Self, ExtractError> {
        Self::with_client(config, None)
    }

    /// Build a pipeline, reusing `http_client` when given.
    pub fn with_client(
        config: PipelineConfig,
        http_client: Option<reqwest::Client>,
    ) -> Result<Self, ExtractError> {
        let locator = ContentLocator::new(&config.region_selectors)?;
        let extractor = AssetExtractor::new(&config.image_selector, &config.lazy_attributes)?;
        let filter = AssetFilter::new(&config.denylist)?;
        let http_client = match http_client {
            Some(client) => client,
            None => build_http_client(&config)?,
        };

        Ok(Self {
            config,
            http_client,
            locator,
            extractor,
            filter,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch `url` and extract its ordered image assets.
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        self.run(url, None).await
    }

    /// Like [`Pipeline::extract`], but gives up with `ErrorKind::Cancelled`
    /// as soon as `cancel` fires.
    pub async fn extract_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        self.run(url, Some(cancel)).await
    }

    /// Extract from markup that was already fetched. `url` is the page it came from.
    pub fn extract_html(&self, html: &str, url: &str) -> ExtractionResult {
        let mut trace = StageTrace::new(url);
        if canonical_page_url(url).is_none() {
            return Err(trace.fail(ExtractError::invalid_url(
                url,
                "ExtractHtml",
                Some(anyhow::anyhow!("not an absolute http(s) URL")),
            )));
        }

        trace.enter(Stage::Parsing);
        let parsed = dom::parse_html(html, url).map_err(|e| trace.fail(e))?;
        let extraction = self.analyze(url, &parsed, &mut trace).map_err(|e| trace.fail(e))?;
        trace.enter(Stage::Done);
        Ok(extraction)
    }

    /// Extract `url` and cache the collection in `store`.
    ///
    /// A store failure is reported in [`Extraction::persisted`] and never
    /// turns a successful extraction into an error.
    pub async fn extract_and_store(&self, url: &str, store: &CacheStore) -> ExtractionResult {
        let mut extraction = self.extract(url).await?;
        self.persist(&mut extraction, store).await;
        Ok(extraction)
    }

    /// Write `extraction` to `store`, recording the outcome on it.
    pub async fn persist(&self, extraction: &mut Extraction, store: &CacheStore) -> PersistStatus {
        let mut trace = StageTrace::new(&extraction.source_url);
        trace.enter(Stage::Persisting);

        let entry = extraction.to_cache_entry();
        let status = match store.put_collection(&entry, &extraction.asset_urls()).await {
            Ok(PutOutcome::Inserted { .. }) => PersistStatus::Inserted,
            Ok(PutOutcome::Duplicate) => PersistStatus::Duplicate,
            Err(e) => {
                tracing::warn!(
                    canonical_url = %extraction.canonical_url,
                    error = %e,
                    "could not cache collection"
                );
                PersistStatus::Failed(e.to_string())
            }
        };

        trace.enter(Stage::Done);
        extraction.persisted = status.clone();
        status
    }

    /// Extract `url` as the latest request of `view`.
    ///
    /// Starting this cancels any earlier request of the same view. Returns
    /// `None` when a newer request began before this one finished.
    pub async fn extract_for_view(&self, url: &str, view: &ViewRequests) -> Option<ExtractionResult> {
        let ticket = view.begin();
        let result = self.extract_with_cancel(url, ticket.cancel_token()).await;
        view.accept(&ticket, result)
    }

    async fn run(&self, url: &str, cancel: Option<&CancellationToken>) -> ExtractionResult {
        let mut trace = StageTrace::new(url);

        trace.enter(Stage::Fetching);
        let req = SourceRequest::new(url, &self.config);
        let fetched = match cancel {
            Some(token) => resource::fetch_with_cancel(&self.http_client, &req, token).await,
            None => resource::fetch(&self.http_client, &req).await,
        };
        let raw = fetched.map_err(|e| trace.fail(e))?;

        trace.enter(Stage::Parsing);
        let extraction = dom::parse(&raw)
            .and_then(|parsed| self.analyze(url, &parsed, &mut trace))
            .map_err(|e| trace.fail(e))?;

        trace.enter(Stage::Done);
        tracing::info!(
            url = %url,
            assets = extraction.assets.len(),
            candidates = extraction.candidate_count,
            fallback = extraction.region_matched.is_none(),
            "extracted"
        );
        Ok(extraction)
    }

    /// Locate, Extract and Filter over a parsed document.
    ///
    /// Kept synchronous: the parsed tree is not `Send` and must not live
    /// across an await point.
    fn analyze(
        &self,
        source_url: &str,
        parsed: &ParsedDocument,
        trace: &mut StageTrace<'_>,
    ) -> ExtractionResult {
        let html: &Html = &parsed.html;

        trace.enter(Stage::Locating);
        let region = self.locator.locate(html);
        if region.is_fallback() {
            tracing::debug!(url = %source_url, "no region selector matched, using whole document");
        }

        trace.enter(Stage::Extracting);
        let candidates = self.extractor.extract(&region);
        let candidate_count = candidates.len();

        trace.enter(Stage::Filtering);
        let assets = self.filter.filter(source_url, candidates)?;

        let canonical_url = canonical_page_url(source_url)
            .or_else(|| canonical_page_url(&parsed.url))
            .unwrap_or_else(|| source_url.to_string());
        let title = extract_title(html).unwrap_or_else(|| canonical_url.clone());

        Ok(Extraction {
            source_url: source_url.to_string(),
            final_url: parsed.url.clone(),
            canonical_url,
            title,
            region_matched: region.matched,
            candidate_count,
            assets,
            persisted: PersistStatus::NotRequested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RegionSelector;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const CHAPTER_URL: &str = "https://site.example/chapter/1";

    const CHAPTER_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Chapter 1</title></head>
<body>
  <header><img src="https://site.example/static/logo.png"></header>
  <div class="reader-content">
    <img data-src="https://cdn.example.com/1.jpg" src="placeholder.gif">
    <img data-src="https://cdn.example.com/2.jpg" src="placeholder.gif">
    <img src="https://cdn.example.com/ad-banner.jpg">
  </div>
  <aside><img src="https://cdn.example.com/sidebar-promo.jpg"></aside>
</body>
</html>"#;

    fn pipeline() -> Pipeline {
        Pipeline::builder().build().unwrap()
    }

    #[test]
    fn chapter_fixture_yields_ordered_assets() {
        let extraction = pipeline().extract_html(CHAPTER_HTML, CHAPTER_URL).unwrap();

        assert_eq!(
            extraction.asset_urls(),
            vec!["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]
        );
        assert_eq!(extraction.region_matched, Some(0));
        assert_eq!(extraction.candidate_count, 3);
        assert_eq!(extraction.title, "Chapter 1");
        assert_eq!(extraction.canonical_url, CHAPTER_URL);
        assert_eq!(extraction.persisted, PersistStatus::NotRequested);
    }

    #[test]
    fn page_without_images_is_not_found() {
        let err = pipeline()
            .extract_html("<html><body><p>Nothing here</p></body></html>", CHAPTER_URL)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.op, "Filter");
    }

    #[test]
    fn empty_document_is_not_found() {
        let err = pipeline().extract_html("", CHAPTER_URL).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn unmatched_region_falls_back_to_whole_document() {
        let html = r#"<body><div class="gallery">
            <img src="https://cdn.example.com/a.jpg">
            <img src="https://cdn.example.com/b.jpg">
        </div></body>"#;
        let extraction = pipeline().extract_html(html, CHAPTER_URL).unwrap();
        assert_eq!(extraction.region_matched, None);
        assert_eq!(
            extraction.asset_urls(),
            vec!["https://cdn.example.com/a.jpg", "https://cdn.example.com/b.jpg"]
        );
    }

    #[test]
    fn configured_region_selector_is_used() {
        let html = r#"<body>
            <img src="https://cdn.example.com/outside.jpg">
            <section id="pages"><img src="https://cdn.example.com/inside.jpg"></section>
        </body>"#;
        let pipeline = Pipeline::builder()
            .region_selectors(vec![RegionSelector::css("#pages")])
            .build()
            .unwrap();
        let extraction = pipeline.extract_html(html, CHAPTER_URL).unwrap();
        assert_eq!(extraction.asset_urls(), vec!["https://cdn.example.com/inside.jpg"]);
    }

    #[test]
    fn title_falls_back_to_canonical_url() {
        let html = r#"<body><div id="reader"><img src="https://cdn.example.com/1.jpg"></div></body>"#;
        let extraction = pipeline()
            .extract_html(html, "https://Site.Example/chapter/9/#top")
            .unwrap();
        assert_eq!(extraction.canonical_url, "https://site.example/chapter/9");
        assert_eq!(extraction.title, "https://site.example/chapter/9");
    }

    #[test]
    fn extract_html_rejects_relative_url() {
        let err = pipeline().extract_html(CHAPTER_HTML, "/chapter/1").unwrap_err();
        assert!(err.is_invalid_url());
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let result = Pipeline::builder()
            .region_selector(RegionSelector::marker("(unclosed"))
            .build();
        match result {
            Err(e) => assert_eq!(e.kind, ErrorKind::Config),
            Ok(_) => panic!("expected a Config error"),
        }
    }

    #[test]
    fn stage_ops() {
        assert_eq!(Stage::Fetching.op(), "Fetch");
        assert_eq!(Stage::Filtering.op(), "Filter");
        assert!(Stage::Failed(ErrorKind::NotFound).is_terminal());
        assert!(!Stage::Locating.is_terminal());
    }

    #[tokio::test]
    async fn extract_over_http() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/chapter/1");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(CHAPTER_HTML);
        });

        let url = server.url("/chapter/1");
        let extraction = pipeline().extract(&url).await.unwrap();

        mock.assert();
        assert_eq!(
            extraction.asset_urls(),
            vec!["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]
        );
        assert_eq!(extraction.source_url, url);
    }

    #[tokio::test]
    async fn network_and_not_found_stay_distinct() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/empty");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html><body></body></html>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        });

        let p = pipeline();
        let empty = p.extract(&server.url("/empty")).await.unwrap_err();
        let gone = p.extract(&server.url("/gone")).await.unwrap_err();

        assert!(empty.is_not_found() && !empty.is_network());
        assert!(gone.is_network() && !gone.is_not_found());
        assert_eq!(gone.status_code(), Some(404));
    }

    #[tokio::test]
    async fn non_markup_payload_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/image");
            then.status(200)
                .header("content-type", "image/jpeg")
                .body("\u{ff}\u{d8}\u{ff}");
        });

        let err = pipeline().extract(&server.url("/image")).await.unwrap_err();
        assert!(err.is_parse());
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_secs(3)).body(CHAPTER_HTML);
        });

        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = pipeline()
            .extract_with_cancel(&server.url("/slow"), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn newer_view_request_supersedes_older() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .header("content-type", "text/html")
                .delay(Duration::from_secs(3))
                .body(CHAPTER_HTML);
        });
        server.mock(|when, then| {
            when.method(GET).path("/fast");
            then.status(200)
                .header("content-type", "text/html")
                .body(CHAPTER_HTML);
        });

        let p = pipeline();
        let view = ViewRequests::new();
        let slow_url = server.url("/slow");
        let fast_url = server.url("/fast");

        let older = p.extract_for_view(&slow_url, &view);
        let newer = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            p.extract_for_view(&fast_url, &view).await
        };
        let (older, newer) = tokio::join!(older, newer);

        assert!(older.is_none());
        let newer = newer.expect("latest request is accepted").unwrap();
        assert_eq!(newer.assets.len(), 2);
    }

    #[tokio::test]
    async fn persist_inserts_then_reports_duplicate() {
        let store = CacheStore::in_memory().await.unwrap();
        let p = pipeline();

        let mut first = p.extract_html(CHAPTER_HTML, CHAPTER_URL).unwrap();
        assert_eq!(p.persist(&mut first, &store).await, PersistStatus::Inserted);
        assert_eq!(first.persisted, PersistStatus::Inserted);

        let mut again = p
            .extract_html(CHAPTER_HTML, "https://site.example/chapter/1/#p2")
            .unwrap();
        assert_eq!(p.persist(&mut again, &store).await, PersistStatus::Duplicate);

        let stored = store.list_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title, "Chapter 1");
        assert_eq!(
            stored[0].assets,
            vec!["https://cdn.example.com/1.jpg", "https://cdn.example.com/2.jpg"]
        );
    }

    #[tokio::test]
    async fn store_failure_does_not_fail_extraction() {
        let store = CacheStore::in_memory().await.unwrap();
        store.close().await;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/chapter/1");
            then.status(200)
                .header("content-type", "text/html")
                .body(CHAPTER_HTML);
        });

        let extraction = pipeline()
            .extract_and_store(&server.url("/chapter/1"), &store)
            .await
            .unwrap();
        assert!(matches!(extraction.persisted, PersistStatus::Failed(_)));
        assert_eq!(extraction.assets.len(), 2);
    }
}

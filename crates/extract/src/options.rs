// ABOUTME: Configuration for the sift pipeline: HeaderProfile, RegionSelector, PipelineConfig, PipelineBuilder.
// ABOUTME: Every site-specific knob is data loadable from JSON; the builder offers a fluent API over it.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::pipeline::Pipeline;

/// Default fetch timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Maximum allowed body size (10 MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Class/id patterns that mark a reading area, tried in order.
pub const DEFAULT_REGION_MARKERS: &[&str] = &[
    r"(?i)^(reader|reading)([-_]?(area|content|container|images|pages))?$",
    r"(?i)^(chapter|comic|manga)[-_]?(content|images|pages|reader|viewer|container)$",
    r"(?i)^(entry|post|article)[-_]?content$",
];

/// Substrings that disqualify an asset URL (case-insensitive).
pub const DEFAULT_DENYLIST: &[&str] = &[
    "/ads/",
    "/ad/",
    "adserver",
    "advert",
    "banner",
    "sponsor",
    "doubleclick",
    "googlesyndication",
    "icon",
    "logo",
    "avatar",
    "emoji",
];

/// Deferred-source attributes, highest precedence first.
pub const DEFAULT_LAZY_ATTRIBUTES: &[&str] = &[
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-echo",
    "data-url",
];

/// CSS selector for image-bearing elements.
pub const DEFAULT_IMAGE_SELECTOR: &str = "img";

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Static request headers sent with every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderProfile {
    pub user_agent: String,
    pub referer: Option<String>,
}

impl Default for HeaderProfile {
    fn default() -> Self {
        Self {
            user_agent: concat!("sift/", env!("CARGO_PKG_VERSION")).to_string(),
            referer: None,
        }
    }
}

/// One predicate used to find the reading area of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegionSelector {
    /// Regex tested against each class token and the id of every element.
    Marker { pattern: String },
    /// CSS selector; the first element it matches is the region.
    Css { selector: String },
}

impl RegionSelector {
    pub fn marker(pattern: impl Into<String>) -> Self {
        RegionSelector::Marker {
            pattern: pattern.into(),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        RegionSelector::Css {
            selector: selector.into(),
        }
    }
}

/// Full pipeline configuration. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub headers: HeaderProfile,
    pub timeout_ms: u64,
    pub verify_tls: bool,
    pub max_body_bytes: usize,
    pub denylist: Vec<String>,
    pub region_selectors: Vec<RegionSelector>,
    pub lazy_attributes: Vec<String>,
    pub image_selector: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            headers: HeaderProfile::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            verify_tls: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            denylist: to_strings(DEFAULT_DENYLIST),
            region_selectors: DEFAULT_REGION_MARKERS
                .iter()
                .map(|p| RegionSelector::marker(*p))
                .collect(),
            lazy_attributes: to_strings(DEFAULT_LAZY_ATTRIBUTES),
            image_selector: DEFAULT_IMAGE_SELECTOR.to_string(),
        }
    }
}

impl PipelineConfig {
    /// The fetch timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ExtractError> {
        serde_json::from_str(json).map_err(|e| {
            ExtractError::config("LoadConfig", Some(anyhow::anyhow!("invalid JSON: {}", e)))
        })
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ExtractError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ExtractError::config(
                "LoadConfig",
                Some(anyhow::anyhow!("reading {}: {}", path.display(), e)),
            )
        })?;
        Self::from_json_str(&text)
    }
}

/// Builder for constructing Pipeline instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    http_client: Option<reqwest::Client>,
}

impl PipelineBuilder {
    /// Create a new PipelineBuilder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            http_client: None,
        }
    }

    /// Set the fetch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.headers.user_agent = user_agent.into();
        self
    }

    /// Set the Referer header.
    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.config.headers.referer = Some(referer.into());
        self
    }

    /// Enable or disable TLS certificate validation.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.config.verify_tls = verify;
        self
    }

    /// Set the maximum accepted body size.
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }

    /// Replace the denylist.
    pub fn denylist<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.denylist = items.into_iter().map(Into::into).collect();
        self
    }

    /// Add one substring to the denylist.
    pub fn deny(mut self, item: impl Into<String>) -> Self {
        self.config.denylist.push(item.into());
        self
    }

    /// Replace the ordered list of region selectors.
    pub fn region_selectors(mut self, selectors: Vec<RegionSelector>) -> Self {
        self.config.region_selectors = selectors;
        self
    }

    /// Append a region selector after the existing ones.
    pub fn region_selector(mut self, selector: RegionSelector) -> Self {
        self.config.region_selectors.push(selector);
        self
    }

    /// Replace the lazy-load attribute precedence list.
    pub fn lazy_attributes<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.lazy_attributes = attrs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the CSS selector for image-bearing elements.
    pub fn image_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.image_selector = selector.into();
        self
    }

    /// Use a custom HTTP client. Timeout and headers are still applied per request.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the configuration and build the Pipeline.
    pub fn build(self) -> Result<Pipeline, ExtractError> {
        Pipeline::with_client(self.config, self.http_client)
    }
}

// ABOUTME: Canonical URL forms: CanonicalAssetUrl for image assets and canonical_page_url for cache keys.
// ABOUTME: Protocol-relative assets become https; relative paths and unknown schemes are rejected, never guessed.

use std::fmt;

use serde::Serialize;
use url::Url;

/// A normalized, absolute http(s) asset URL. Equality is on this form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalAssetUrl(String);

impl CanonicalAssetUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalAssetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalAssetUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Normalize a raw attribute value into a canonical asset URL.
///
/// Rules, in order:
/// 1. `//host/path` becomes `https://host/path`.
/// 2. Relative paths are rejected.
/// 3. Anything without an http or https scheme is rejected.
pub fn normalize_asset_url(raw: &str) -> Option<CanonicalAssetUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let absolute = match trimmed.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    };

    let parsed = Url::parse(&absolute).ok()?;
    if !is_web_scheme(&parsed) || parsed.host_str().is_none() {
        return None;
    }

    Some(CanonicalAssetUrl(parsed.to_string()))
}

/// Canonical form of a page URL, used as the cache key for its collection.
///
/// Lowercases scheme and host, drops default ports and the fragment, keeps the
/// query, and trims a trailing slash from non-root paths.
pub fn canonical_page_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    if !is_web_scheme(&parsed) || parsed.host_str().is_none() {
        return None;
    }

    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    Some(parsed.to_string())
}

// ABOUTME: AssetFilter: removes denylisted and non-extractable candidates and canonicalizes the rest.
// ABOUTME: Order-preserving; an empty result is a NotFound error rather than an empty success.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;

use crate::error::ExtractError;
use crate::extractors::assets::ImageCandidate;
use crate::extractors::urls::{normalize_asset_url, CanonicalAssetUrl};

const OP: &str = "Filter";

/// Denylist matcher plus URL normalization.
pub struct AssetFilter {
    denylist: Option<AhoCorasick>,
}

impl AssetFilter {
    /// Build a filter from denylist substrings, matched case-insensitively.
    /// Blank entries are ignored.
    pub fn new(denylist: &[String]) -> Result<Self, ExtractError> {
        let patterns: Vec<&str> = denylist
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        if patterns.is_empty() {
            return Ok(Self { denylist: None });
        }

        let matcher = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&patterns)
            .map_err(|e| {
                ExtractError::config(
                    "CompileDenylist",
                    Some(anyhow::anyhow!("invalid denylist: {}", e)),
                )
            })?;

        Ok(Self {
            denylist: Some(matcher),
        })
    }

    /// Returns true if `raw` contains any denylisted substring.
    pub fn is_denied(&self, raw: &str) -> bool {
        self.denylist.as_ref().is_some_and(|m| m.is_match(raw))
    }

    /// Filter candidates into canonical asset URLs, keeping input order.
    ///
    /// Repeats of an already accepted canonical URL are dropped. `page_url`
    /// labels the NotFound error returned when nothing survives.
    pub fn filter(
        &self,
        page_url: &str,
        candidates: Vec<ImageCandidate>,
    ) -> Result<Vec<CanonicalAssetUrl>, ExtractError> {
        let total = candidates.len();
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for candidate in candidates {
            if self.is_denied(&candidate.raw_value) {
                tracing::trace!(
                    value = %candidate.raw_value,
                    attribute = %candidate.attribute,
                    kind = ?candidate.attribute_kind,
                    "denylisted"
                );
                continue;
            }

            let Some(url) = normalize_asset_url(&candidate.raw_value) else {
                tracing::trace!(
                    value = %candidate.raw_value,
                    attribute = %candidate.attribute,
                    kind = ?candidate.attribute_kind,
                    "not an absolute web URL"
                );
                continue;
            };

            if seen.insert(url.clone()) {
                accepted.push(url);
            }
        }

        if accepted.is_empty() {
            return Err(ExtractError::not_found(
                page_url,
                OP,
                Some(anyhow::anyhow!(
                    "0 of {} image candidates survived filtering",
                    total
                )),
            ));
        }

        Ok(accepted)
    }
}

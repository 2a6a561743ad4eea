// ABOUTME: AssetExtractor: walks image-bearing elements of a content region in document order.
// ABOUTME: Prefers a lazy-load attribute over the standard src and records which one was used.

use scraper::{ElementRef, Selector};
use serde::Serialize;

use crate::dom::locate::ContentRegion;
use crate::error::ExtractError;

/// Which kind of attribute supplied a candidate's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Lazy,
    Standard,
}

/// One image reference found in the content region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub raw_value: String,
    /// Position among the region's image elements. The only ordering key.
    pub dom_order: usize,
    pub attribute_kind: AttributeKind,
    pub attribute: String,
}

/// Collects ordered image candidates from a region.
pub struct AssetExtractor {
    image_selector: Selector,
    lazy_attributes: Vec<String>,
}

impl AssetExtractor {
    /// `lazy_attributes` are tried in order before `src`.
    pub fn new(image_selector: &str, lazy_attributes: &[String]) -> Result<Self, ExtractError> {
        let image_selector = Selector::parse(image_selector).map_err(|e| {
            ExtractError::config(
                "CompileImageSelector",
                Some(anyhow::anyhow!("invalid CSS selector {:?}: {}", image_selector, e)),
            )
        })?;
        Ok(Self {
            image_selector,
            lazy_attributes: lazy_attributes.to_vec(),
        })
    }

    /// Image candidates in reading order. Elements with no populated source
    /// attribute are skipped.
    pub fn extract(&self, region: &ContentRegion<'_>) -> Vec<ImageCandidate> {
        region
            .root
            .select(&self.image_selector)
            .enumerate()
            .filter_map(|(dom_order, el)| self.candidate(dom_order, el))
            .collect()
    }

    fn candidate(&self, dom_order: usize, el: ElementRef<'_>) -> Option<ImageCandidate> {
        let value = el.value();

        for attr in &self.lazy_attributes {
            if let Some(raw) = populated(value.attr(attr)) {
                return Some(ImageCandidate {
                    raw_value: raw.to_string(),
                    dom_order,
                    attribute_kind: AttributeKind::Lazy,
                    attribute: attr.clone(),
                });
            }
        }

        populated(value.attr("src")).map(|raw| ImageCandidate {
            raw_value: raw.to_string(),
            dom_order,
            attribute_kind: AttributeKind::Standard,
            attribute: "src".to_string(),
        })
    }
}

fn populated(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

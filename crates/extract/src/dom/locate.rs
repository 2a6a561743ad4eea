// ABOUTME: ContentLocator: finds the subtree of a parsed page that holds the reading content.
// ABOUTME: Tries an ordered list of compiled region selectors and falls back to the whole document.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractError;
use crate::options::RegionSelector;

enum CompiledSelector {
    Marker(Regex),
    Css(Selector),
}

impl CompiledSelector {
    fn compile(region: &RegionSelector) -> Result<Self, ExtractError> {
        match region {
            RegionSelector::Marker { pattern } => Regex::new(pattern)
                .map(CompiledSelector::Marker)
                .map_err(|e| {
                    ExtractError::config(
                        "CompileRegionSelector",
                        Some(anyhow::anyhow!("invalid marker pattern {:?}: {}", pattern, e)),
                    )
                }),
            RegionSelector::Css { selector } => Selector::parse(selector)
                .map(CompiledSelector::Css)
                .map_err(|e| {
                    ExtractError::config(
                        "CompileRegionSelector",
                        Some(anyhow::anyhow!("invalid CSS selector {:?}: {}", selector, e)),
                    )
                }),
        }
    }

    fn first_match<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        match self {
            CompiledSelector::Css(selector) => doc.select(selector).next(),
            CompiledSelector::Marker(re) => doc
                .root_element()
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|el| has_marker(el, re)),
        }
    }
}

/// True if the element's id or any of its class tokens matches `re`.
fn has_marker(el: &ElementRef, re: &Regex) -> bool {
    let value = el.value();
    value.id().is_some_and(|id| re.is_match(id)) || value.classes().any(|c| re.is_match(c))
}

/// The part of a document judged to hold the reading content.
#[derive(Debug, Clone, Copy)]
pub struct ContentRegion<'a> {
    pub root: ElementRef<'a>,
    /// Index of the selector that matched, `None` when the whole document is used.
    pub matched: Option<usize>,
}

impl ContentRegion<'_> {
    /// Returns true when no selector matched and the whole document is the region.
    pub fn is_fallback(&self) -> bool {
        self.matched.is_none()
    }
}

/// Locates the reading area of a page.
pub struct ContentLocator {
    selectors: Vec<CompiledSelector>,
}

impl ContentLocator {
    /// Compile the ordered selector list. Invalid patterns are a Config error.
    pub fn new(regions: &[RegionSelector]) -> Result<Self, ExtractError> {
        let selectors = regions
            .iter()
            .map(CompiledSelector::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    /// Returns the first subtree matched by the selectors, in selector order.
    ///
    /// Never fails: when nothing matches, the whole document is the region.
    pub fn locate<'a>(&self, doc: &'a Html) -> ContentRegion<'a> {
        for (index, selector) in self.selectors.iter().enumerate() {
            if let Some(root) = selector.first_match(doc) {
                return ContentRegion {
                    root,
                    matched: Some(index),
                };
            }
        }
        ContentRegion {
            root: doc.root_element(),
            matched: None,
        }
    }
}

// ABOUTME: Collection title lookup for cache entries.
// ABOUTME: Tries og:title, then <title>, then the first h1, with whitespace normalized.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Title sources in priority order: (selector, attribute) where `None` means element text.
static TITLE_SOURCES: Lazy<Vec<(Selector, Option<&'static str>)>> = Lazy::new(|| {
    vec![
        (Selector::parse("meta[property='og:title']").unwrap(), Some("content")),
        (Selector::parse("title").unwrap(), None),
        (Selector::parse("h1").unwrap(), None),
    ]
});

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract a human-readable title for the page, if it has one.
pub fn extract_title(doc: &Html) -> Option<String> {
    for (selector, attr) in TITLE_SOURCES.iter() {
        for el in doc.select(selector) {
            let raw = match attr {
                Some(name) => el.value().attr(name).unwrap_or_default().to_string(),
                None => el.text().collect::<String>(),
            };
            let title = normalize_whitespace(&raw);
            if !title.is_empty() {
                return Some(title);
            }
        }
    }
    None
}

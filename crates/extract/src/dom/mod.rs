// ABOUTME: DocumentParser for sift: turns a raw fetched payload into a scraper HTML tree.
// ABOUTME: Malformed markup is tolerated; only payloads that are not markup at all are rejected.

//! Document parsing and content-region location.
//!
//! Parsing is best-effort: html5ever repairs unbalanced tags and missing
//! doctypes, and an empty tree is a valid result (the pipeline later reports
//! it as "no content found").

pub mod locate;

use scraper::Html;

use crate::error::ExtractError;
use crate::resource::RawDocument;

const OP: &str = "Parse";

/// A parsed page and the URL it was served from.
#[derive(Debug)]
pub struct ParsedDocument {
    pub url: String,
    pub html: Html,
}

/// Returns true if a content-type can plausibly hold markup.
fn is_markup_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    essence.is_empty()
        || essence.starts_with("text/")
        || essence.contains("html")
        || essence.contains("xml")
}

/// Parse a fetched document.
pub fn parse(raw: &RawDocument) -> Result<ParsedDocument, ExtractError> {
    if let Some(ct) = raw.content_type.as_deref() {
        if !is_markup_content_type(ct) {
            return Err(ExtractError::parse(
                &raw.url,
                OP,
                Some(anyhow::anyhow!("unsupported content type: {}", ct)),
            ));
        }
    }
    parse_html(&raw.text(), &raw.final_url)
}

/// Parse markup that was obtained some other way.
///
/// Fails only when the text cannot be markup, i.e. it carries NUL characters.
pub fn parse_html(text: &str, url: &str) -> Result<ParsedDocument, ExtractError> {
    if text.contains('\0') {
        return Err(ExtractError::parse(
            url,
            OP,
            Some(anyhow::anyhow!("payload is binary, not markup")),
        ));
    }

    Ok(ParsedDocument {
        url: url.to_string(),
        html: Html::parse_document(text),
    })
}

// ABOUTME: Fetcher for sift: performs the HTTP GET for a page and returns the raw document.
// ABOUTME: Classifies failures as timeout, status, transport, or cancellation; enforces body size limits and decodes charsets.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::error::ExtractError;
use crate::options::{HeaderProfile, PipelineConfig};

const OP: &str = "Fetch";

/// Idle connections kept per host by the shared client.
pub const MAX_IDLE_PER_HOST: usize = 5;

/// One fetch request. Built per invocation and never mutated.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub url: String,
    pub headers: HeaderProfile,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl SourceRequest {
    /// Build a request for `url` from the pipeline configuration.
    pub fn new(url: impl Into<String>, config: &PipelineConfig) -> Self {
        Self {
            url: url.into(),
            headers: config.headers.clone(),
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// The fetched payload plus where it came from.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl RawDocument {
    /// Decode the body as text, using the charset from the content-type header
    /// or, failing that, charset detection.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Build the shared HTTP client for a pipeline.
pub fn build_http_client(config: &PipelineConfig) -> Result<reqwest::Client, ExtractError> {
    reqwest::Client::builder()
        .user_agent(&config.headers.user_agent)
        .danger_accept_invalid_certs(!config.verify_tls)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| {
            ExtractError::config(
                "BuildClient",
                Some(anyhow::anyhow!("failed to build HTTP client: {}", e)),
            )
        })
}

/// Decode body bytes to a String using charset from content-type header or detection.
pub(crate) fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract charset value from Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

fn classify(url: &str, err: reqwest::Error, what: &str) -> ExtractError {
    if err.is_timeout() {
        ExtractError::timeout(url, OP, Some(anyhow::anyhow!("{}: {}", what, err)))
    } else {
        ExtractError::transport(url, OP, Some(anyhow::anyhow!("{}: {}", what, err)))
    }
}

/// Fetch a document. No retries: a failure is returned to the caller as-is.
pub async fn fetch(
    client: &reqwest::Client,
    req: &SourceRequest,
) -> Result<RawDocument, ExtractError> {
    let url = req.url.as_str();

    let parsed_url = url::Url::parse(url).map_err(|e| {
        ExtractError::invalid_url(url, OP, Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ExtractError::invalid_url(
            url,
            OP,
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    let mut request = client
        .get(parsed_url)
        .timeout(req.timeout)
        .header(USER_AGENT, &req.headers.user_agent);
    if let Some(referer) = &req.headers.referer {
        request = request.header(REFERER, referer);
    }

    let response = request
        .send()
        .await
        .map_err(|e| classify(url, e, "request failed"))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::status(url, OP, status.as_u16()));
    }

    if let Some(len) = response.content_length() {
        if len as usize > req.max_body_bytes {
            return Err(ExtractError::transport(
                url,
                OP,
                Some(anyhow::anyhow!("content too large: {} bytes", len)),
            ));
        }
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    let body = response
        .bytes()
        .await
        .map_err(|e| classify(url, e, "failed to read body"))?;

    if body.len() > req.max_body_bytes {
        return Err(ExtractError::transport(
            url,
            OP,
            Some(anyhow::anyhow!("content too large: {} bytes", body.len())),
        ));
    }

    Ok(RawDocument {
        url: url.to_string(),
        final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Fetch a document, giving up with a Cancelled error as soon as `cancel` fires.
pub async fn fetch_with_cancel(
    client: &reqwest::Client,
    req: &SourceRequest,
    cancel: &CancellationToken,
) -> Result<RawDocument, ExtractError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractError::cancelled(&req.url, OP)),
        result = fetch(client, req) => result,
    }
}

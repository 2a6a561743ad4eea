// ABOUTME: Error types for the sift pipeline including the ErrorKind enum and ExtractError struct.
// ABOUTME: Keeps network, parse, and no-content failures distinct, with convenience constructors and predicates.

use std::fmt;

/// Categories of extraction failure.
///
/// `Timeout`, `Status`, `Transport` and `Cancelled` are network failures the
/// caller may retry; `NotFound` means the page loaded but held no content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUrl,
    Config,
    Timeout,
    Status(u16),
    Transport,
    Cancelled,
    Parse,
    NotFound,
}

impl ErrorKind {
    /// Returns true for failures of the fetch stage.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Status(_) | ErrorKind::Transport | ErrorKind::Cancelled
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidUrl => write!(f, "invalid URL"),
            ErrorKind::Config => write!(f, "invalid configuration"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Status(code) => write!(f, "HTTP status {}", code),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Parse => write!(f, "parse error"),
            ErrorKind::NotFound => write!(f, "no content found"),
        }
    }
}

/// The error type for every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub struct ExtractError {
    pub kind: ErrorKind,
    pub url: String,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sift: {} {}: {}", self.op, self.url, self.kind)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ExtractError {
    fn new(
        kind: ErrorKind,
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            op: op.into(),
            source,
        }
    }

    /// Create an InvalidUrl error.
    pub fn invalid_url(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::InvalidUrl, url, op, source)
    }

    /// Create a Config error.
    pub fn config(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorKind::Config, String::new(), op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Timeout, url, op, source)
    }

    /// Create a Status error for a non-success HTTP response.
    pub fn status(url: impl Into<String>, op: impl Into<String>, code: u16) -> Self {
        Self::new(ErrorKind::Status(code), url, op, None)
    }

    /// Create a Transport error.
    pub fn transport(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Transport, url, op, source)
    }

    /// Create a Cancelled error.
    pub fn cancelled(url: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, url, op, None)
    }

    /// Create a Parse error.
    pub fn parse(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::Parse, url, op, source)
    }

    /// Create a NotFound error.
    pub fn not_found(
        url: impl Into<String>,
        op: impl Into<String>,
        source: Option<anyhow::Error>,
    ) -> Self {
        Self::new(ErrorKind::NotFound, url, op, source)
    }

    /// Returns true if this is a fetch-stage failure.
    pub fn is_network(&self) -> bool {
        self.kind.is_network()
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Returns true if this is a Cancelled error.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Returns true if this is a Parse error.
    pub fn is_parse(&self) -> bool {
        self.kind == ErrorKind::Parse
    }

    /// Returns true if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true if this is an InvalidUrl error.
    pub fn is_invalid_url(&self) -> bool {
        self.kind == ErrorKind::InvalidUrl
    }

    /// The HTTP status code, for Status errors.
    pub fn status_code(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }
}

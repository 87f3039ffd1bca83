//! Error types for webdoc.
//!
//! Library crates use [`WebdocError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Recoverable failures ([`FetchError`], extraction, image, sitemap) are
//! logged and skipped by the crawler; only configuration errors, an
//! unreachable seed, and render errors abort a run.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all webdoc operations.
#[derive(Debug, thiserror::Error)]
pub enum WebdocError {
    /// Invalid or inconsistent configuration. Fatal.
    #[error("config error: {message}")]
    Config { message: String },

    /// The seed URL could not be fetched. Fatal.
    #[error("seed unreachable: {url}: {source}")]
    SeedUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    /// A single HTTP fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// No content-bearing element could be located in a page.
    #[error("extraction error at {url}: {message}")]
    Extraction { url: String, message: String },

    /// An image could not be fetched or decoded.
    #[error("image error at {url}: {message}")]
    Image { url: String, message: String },

    /// A sitemap could not be fetched or parsed.
    #[error("sitemap error: {0}")]
    Sitemap(String),

    /// XML/HTML parse error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A renderer failed to produce its artifact.
    #[error("render error ({format}): {message}")]
    Render { format: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty document, bad selection, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WebdocError>;

impl WebdocError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an extraction error for a page.
    pub fn extraction(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create an image error for an image URL.
    pub fn image(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Image {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a render error naming the responsible format.
    pub fn render(format: impl std::fmt::Display, msg: impl Into<String>) -> Self {
        Self::Render {
            format: format.to_string(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the run must stop because of this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::SeedUnreachable { .. } | Self::Render { .. } | Self::Io { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Failure of a single HTTP GET.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("{url}: timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// The server answered with a non-success status.
    #[error("{url}: HTTP {status}")]
    Status { url: String, status: u16 },

    /// The connection could not be established.
    #[error("{url}: connection failed: {message}")]
    Connect { url: String, message: String },

    /// The response is not an HTML document.
    #[error("{url}: not HTML (content-type: {content_type})")]
    NotHtml { url: String, content_type: String },

    /// The body could not be read or decoded.
    #[error("{url}: failed to read body: {message}")]
    Body { url: String, message: String },

    /// Any other transport failure.
    #[error("{url}: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// The URL the failed request targeted.
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Status { url, .. }
            | Self::Connect { url, .. }
            | Self::NotHtml { url, .. }
            | Self::Body { url, .. }
            | Self::Request { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WebdocError::config("max_pages must be greater than 0");
        assert_eq!(err.to_string(), "config error: max_pages must be greater than 0");

        let err = WebdocError::render("docx", "feature not compiled in");
        assert!(err.to_string().contains("(docx)"));
    }

    #[test]
    fn fatal_classification() {
        assert!(WebdocError::config("x").is_fatal());
        assert!(WebdocError::render("pdf", "x").is_fatal());
        assert!(!WebdocError::extraction("https://a.test/", "empty").is_fatal());
        assert!(!WebdocError::Sitemap("404".into()).is_fatal());

        let seed = WebdocError::SeedUnreachable {
            url: "https://a.test/".into(),
            source: FetchError::Status {
                url: "https://a.test/".into(),
                status: 404,
            },
        };
        assert!(seed.is_fatal());
    }

    #[test]
    fn retryable_statuses() {
        let status = |s| FetchError::Status {
            url: "https://a.test/".into(),
            status: s,
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(
            !FetchError::NotHtml {
                url: "u".into(),
                content_type: "image/png".into()
            }
            .is_retryable()
        );
    }
}

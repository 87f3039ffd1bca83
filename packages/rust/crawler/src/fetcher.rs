//! Rate-limited HTTP fetcher with timeout and retry.
//!
//! Every request first waits the configured delay, then retries transient
//! failures (timeouts, connection errors, 429 and 5xx) with exponential
//! backoff. Non-retryable failures are returned immediately.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;
use webdoc_shared::{CrawlConfig, FetchError, Result, WebdocError};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 10;

/// Base backoff between retries; doubled on each attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Content types accepted as HTML pages.
const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct HtmlResponse {
    /// Final URL after redirects.
    pub final_url: Url,
    /// Decoded body.
    pub body: String,
}

/// A fetched binary resource (images).
#[derive(Debug, Clone)]
pub struct BinaryResponse {
    /// Final URL after redirects.
    pub final_url: Url,
    /// Lowercased `Content-Type` header, empty when absent.
    pub content_type: String,
    /// Raw body bytes.
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Issues delayed, retried GET requests over one shared connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    delay: Duration,
    timeout: Duration,
    retries: u32,
}

impl Fetcher {
    /// Build a fetcher from the crawl configuration.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|e| WebdocError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            delay: config.delay,
            timeout: config.timeout,
            retries: config.retries,
        })
    }

    /// Fetch an HTML page. Non-HTML responses fail with [`FetchError::NotHtml`].
    pub async fn fetch_html(&self, url: &Url) -> std::result::Result<HtmlResponse, FetchError> {
        let response = self.send_with_retry(url).await?;
        let final_url = response.url().clone();
        let content_type = content_type_of(&response);

        if !HTML_TYPES.iter().any(|t| content_type.contains(t)) {
            return Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(HtmlResponse { final_url, body })
    }

    /// Fetch a resource as raw bytes, whatever its content type.
    pub async fn fetch_bytes(&self, url: &Url) -> std::result::Result<BinaryResponse, FetchError> {
        let response = self.send_with_retry(url).await?;
        let final_url = response.url().clone();
        let content_type = content_type_of(&response);

        let bytes = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(BinaryResponse {
            final_url,
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Wait the configured delay, then GET with retries on transient errors.
    async fn send_with_retry(
        &self,
        url: &Url,
    ) -> std::result::Result<reqwest::Response, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut attempt: u32 = 0;
        loop {
            debug!(%url, attempt, "GET");
            let err = match self.send_once(url).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= self.retries {
                return Err(err);
            }

            let backoff = RETRY_BACKOFF * 2u32.pow(attempt);
            warn!(%url, attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "retrying request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, url: &Url) -> std::result::Result<reqwest::Response, FetchError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Map a transport error onto the fetch error taxonomy.
    fn classify(&self, url: &Url, err: reqwest::Error) -> FetchError {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout {
                url,
                after: self.timeout,
            }
        } else if err.is_connect() {
            FetchError::Connect {
                url,
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            FetchError::Body {
                url,
                message: err.to_string(),
            }
        } else {
            FetchError::Request {
                url,
                message: err.to_string(),
            }
        }
    }
}

fn content_type_of(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase()
}

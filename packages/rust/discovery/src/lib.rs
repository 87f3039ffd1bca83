//! Sitemap discovery.
//!
//! When sitemap mode is on, webdoc reads the site's XML sitemap instead of
//! following links. The sitemap is either given explicitly or auto-detected
//! at a few well-known locations. Sitemap indexes are followed recursively up
//! to [`MAX_INDEX_NESTING`] levels.
//!
//! Discovery never fails a run: an unreachable or malformed sitemap yields
//! [`SitemapResult::NotFound`] and the caller falls back to link-following.
//! Scope filtering of the returned URLs is the caller's job.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;
use webdoc_shared::{DEFAULT_USER_AGENT, Result, WebdocError};

pub use parser::{SitemapDoc, parse_sitemap};

/// Maximum nesting of sitemap indexes that is followed.
pub const MAX_INDEX_NESTING: usize = 3;

/// Maximum number of redirects to follow when fetching a sitemap.
const MAX_REDIRECTS: usize = 5;

/// Default timeout for fetching a sitemap.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// SitemapResult
// ---------------------------------------------------------------------------

/// Outcome of sitemap discovery.
#[derive(Debug, Clone)]
pub enum SitemapResult {
    /// A sitemap was found and listed at least one page.
    Found {
        /// The sitemap (or index) the URLs came from.
        sitemap_url: Url,
        /// Page URLs in sitemap order, de-duplicated.
        urls: Vec<Url>,
    },
    /// No usable sitemap; caller should fall back to link-following.
    NotFound,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Configuration for sitemap discovery.
#[derive(Debug, Clone)]
pub struct SitemapOptions {
    /// Timeout for each sitemap request.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Discover page URLs from a sitemap.
///
/// With `explicit` set only that sitemap is read. Otherwise the locations
/// from [`candidate_sitemap_urls`] are tried in order and the first one
/// listing at least one page wins.
#[instrument(skip_all, fields(seed = %seed))]
pub async fn discover(
    seed: &Url,
    explicit: Option<&Url>,
    opts: &SitemapOptions,
) -> Result<SitemapResult> {
    let client = build_client(opts)?;

    let candidates = match explicit {
        Some(url) => vec![url.clone()],
        None => candidate_sitemap_urls(seed),
    };

    for candidate in candidates {
        info!(sitemap = %candidate, "checking for sitemap");
        let urls = collect_urls(&client, &candidate).await;
        if urls.is_empty() {
            debug!(sitemap = %candidate, "sitemap missing or empty");
            continue;
        }
        info!(sitemap = %candidate, urls = urls.len(), "sitemap discovered and parsed");
        return Ok(SitemapResult::Found {
            sitemap_url: candidate,
            urls,
        });
    }

    warn!("no usable sitemap found, falling back to link-following");
    Ok(SitemapResult::NotFound)
}

/// Well-known sitemap locations for `seed`, in probing order:
/// `<seed>/sitemap.xml`, `<origin>/sitemap.xml`, `<origin>/sitemap_index.xml`.
pub fn candidate_sitemap_urls(seed: &Url) -> Vec<Url> {
    let mut base = seed.clone();
    base.set_query(None);
    base.set_fragment(None);
    let seed_dir = format!("{}/", base.as_str().trim_end_matches('/'));

    let mut out: Vec<Url> = Vec::new();
    let candidates = [
        Url::parse(&seed_dir).and_then(|u| u.join("sitemap.xml")),
        seed.join("/sitemap.xml"),
        seed.join("/sitemap_index.xml"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read a sitemap and every nested index below it, returning page URLs.
///
/// Failures of individual sitemaps are logged and skipped.
async fn collect_urls(client: &Client, root: &Url) -> Vec<Url> {
    let mut pending: Vec<(Url, usize)> = vec![(root.clone(), 0)];
    let mut fetched: HashSet<Url> = HashSet::new();
    let mut seen: HashSet<Url> = HashSet::new();
    let mut urls: Vec<Url> = Vec::new();

    while let Some((sitemap_url, nesting)) = pending.pop() {
        if !fetched.insert(sitemap_url.clone()) {
            continue;
        }

        let doc = match fetch_sitemap(client, &sitemap_url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(sitemap = %sitemap_url, error = %e, "skipping sitemap");
                continue;
            }
        };

        match doc {
            SitemapDoc::UrlSet(locs) => {
                for loc in locs {
                    match sitemap_url.join(&loc) {
                        Ok(url) if seen.insert(url.clone()) => urls.push(url),
                        Ok(_) => {}
                        Err(e) => debug!(loc = %loc, error = %e, "invalid sitemap location"),
                    }
                }
            }
            SitemapDoc::Index(children) => {
                if nesting >= MAX_INDEX_NESTING {
                    warn!(sitemap = %sitemap_url, "sitemap index nested too deeply, ignoring children");
                    continue;
                }
                // Reverse so children are visited in document order.
                for loc in children.iter().rev() {
                    if let Ok(child) = sitemap_url.join(loc) {
                        pending.push((child, nesting + 1));
                    }
                }
            }
        }
    }

    urls
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &SitemapOptions) -> Result<Client> {
    Client::builder()
        .user_agent(opts.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(opts.timeout)
        .build()
        .map_err(|e| WebdocError::config(format!("failed to build HTTP client: {e}")))
}

/// Fetch and parse one sitemap document.
async fn fetch_sitemap(client: &Client, url: &Url) -> Result<SitemapDoc> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| WebdocError::Sitemap(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(WebdocError::Sitemap(format!("{url}: HTTP {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| WebdocError::Sitemap(format!("{url}: failed to read body: {e}")))?;
    let body = decode_body(&bytes).map_err(|e| WebdocError::Sitemap(format!("{url}: {e}")))?;

    parse_sitemap(&body).map_err(|e| WebdocError::Sitemap(format!("{url}: {e}")))
}

/// Sitemap body as text. `.xml.gz` files arrive as raw gzip bytes.
fn decode_body(bytes: &[u8]) -> std::io::Result<String> {
    if !bytes.starts_with(&[0x1f, 0x8b]) {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }
    let mut xml = String::new();
    GzDecoder::new(bytes).read_to_string(&mut xml)?;
    Ok(xml)
}

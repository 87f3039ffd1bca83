//! Sitemap XML parser.
//!
//! Handles the two document types of the sitemaps.org protocol:
//! - `<urlset>`: a list of `<url><loc>…</loc></url>` page entries
//! - `<sitemapindex>`: a list of `<sitemap><loc>…</loc></sitemap>` child sitemaps
//!
//! Only `<loc>` values matter here, so the parser is regex based rather than
//! a full XML reader. CDATA-wrapped locations and the five predefined XML
//! entities are supported.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use webdoc_shared::{Result, WebdocError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parsed representation of one sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDoc {
    /// A `<urlset>` listing page URLs.
    UrlSet(Vec<String>),
    /// A `<sitemapindex>` listing child sitemap URLs.
    Index(Vec<String>),
}

impl SitemapDoc {
    /// The `<loc>` values, whichever kind this is.
    pub fn locations(&self) -> &[String] {
        match self {
            SitemapDoc::UrlSet(locs) | SitemapDoc::Index(locs) => locs,
        }
    }
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `<loc>…</loc>`, optionally CDATA-wrapped.
static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>").expect("loc regex")
});

/// Matches the root element of a sitemap index.
static INDEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<sitemapindex[\s>]").expect("index regex"));

/// Matches the root element of a urlset.
static URLSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<urlset[\s>]").expect("urlset regex"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a sitemap document.
///
/// Fails with a parse error when the body is neither a `<urlset>` nor a
/// `<sitemapindex>`, e.g. an HTML error page served with status 200.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDoc> {
    let is_index = INDEX_RE.is_match(xml);
    if !is_index && !URLSET_RE.is_match(xml) {
        return Err(WebdocError::parse(
            "document is neither a <urlset> nor a <sitemapindex>",
        ));
    }

    let mut seen = HashSet::new();
    let mut locations: Vec<String> = Vec::new();
    for cap in LOC_RE.captures_iter(xml) {
        let loc = unescape_xml(&cap[1]);
        if !loc.is_empty() && seen.insert(loc.clone()) {
            locations.push(loc);
        }
    }

    Ok(if is_index {
        SitemapDoc::Index(locations)
    } else {
        SitemapDoc::UrlSet(locations)
    })
}

/// Replace the predefined XML entities.
fn unescape_xml(raw: &str) -> String {
    raw.trim()
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

//! Link analysis: URL normalization, crawl scope, and page filters.
//!
//! Scope decides reachability (which links become crawl tasks). Filters
//! decide inclusion (which fetched pages make it into the document). A page
//! rejected by the filters is still used for link discovery.

use std::fmt;

use url::Url;
use webdoc_shared::FiltersConfig;

/// Query parameters dropped during normalization, besides any `utm_*`.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Path extensions of resources that are never documentation pages.
const NON_DOC_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "bmp", "zip", "gz", "tgz", "tar",
    "rar", "7z", "exe", "dmg", "msi", "json", "xml", "js", "mjs", "css", "woff", "woff2", "ttf",
    "mp3", "mp4", "webm",
];

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Canonical form of a URL used for de-duplication.
///
/// Strips the fragment, lowercases the host, drops default ports, collapses
/// dot segments and repeated slashes, removes a trailing slash (except on the
/// root), drops tracking parameters and sorts the rest, and removes an empty
/// query.
pub fn normalize(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);

    // `Url` already lowercases scheme and host and drops default ports when
    // parsing; re-apply in case the value was built by hand.
    if let Some(host) = url.host_str().map(str::to_lowercase) {
        let _ = url.set_host(Some(&host));
    }
    if url.port() == default_port(url.scheme()) {
        let _ = url.set_port(None);
    }

    let path = normalize_path(url.path());
    url.set_path(&path);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !is_tracking_param(k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Collapse `.`/`..` and empty segments; no trailing slash except on `/`.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// Why a URL or page was turned away. Rejection is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Not an http(s) link (`mailto:`, `javascript:`, `tel:`, ...).
    Scheme(String),
    /// Different host than the seed.
    Host(String),
    /// Same host but outside the seed's path prefix.
    OutsidePrefix,
    /// Links to a non-document resource.
    Resource(String),
    /// Text or URL mentions an excluded keyword.
    ExcludedKeyword(String),
    /// None of the include keywords matched.
    MissingKeyword,
    /// The page's category is not among the selected ones.
    Category(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheme(scheme) => write!(f, "unsupported scheme {scheme}"),
            Self::Host(host) => write!(f, "other host {host}"),
            Self::OutsidePrefix => f.write_str("outside documentation path"),
            Self::Resource(ext) => write!(f, "non-document resource .{ext}"),
            Self::ExcludedKeyword(k) => write!(f, "contains excluded keyword {k:?}"),
            Self::MissingKeyword => f.write_str("no include keyword matched"),
            Self::Category(c) => write!(f, "category {c:?} not selected"),
        }
    }
}

/// Outcome of a scope or filter check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeDecision {
    Accept,
    Reject(RejectReason),
}

impl ScopeDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

// ---------------------------------------------------------------------------
// CrawlScope
// ---------------------------------------------------------------------------

/// Host and path prefix a crawl is confined to.
#[derive(Debug, Clone)]
pub struct CrawlScope {
    host: String,
    /// Directory of the seed path, always ending in `/`.
    base_path: String,
}

impl CrawlScope {
    /// Scope of a crawl seeded at `seed`: same host, same directory.
    ///
    /// The directory is the seed path up to its last `/`, so both
    /// `/guide/` and `/guide/intro` scope to `/guide/`.
    pub fn new(seed: &Url) -> Self {
        let path = seed.path();
        let base_path = match path.rfind('/') {
            Some(idx) => path[..=idx].to_string(),
            None => "/".to_string(),
        };
        Self {
            host: seed.host_str().unwrap_or_default().to_lowercase(),
            base_path,
        }
    }

    /// Path prefix in-scope URLs share.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Decide whether `url` may become a crawl task.
    pub fn check(&self, url: &Url) -> ScopeDecision {
        if !matches!(url.scheme(), "http" | "https") {
            return ScopeDecision::Reject(RejectReason::Scheme(url.scheme().to_string()));
        }

        let host = url.host_str().unwrap_or_default();
        if !host.eq_ignore_ascii_case(&self.host) {
            return ScopeDecision::Reject(RejectReason::Host(host.to_string()));
        }

        let path = url.path();
        if !self.contains_path(path) {
            return ScopeDecision::Reject(RejectReason::OutsidePrefix);
        }

        if let Some(ext) = resource_extension(path) {
            return ScopeDecision::Reject(RejectReason::Resource(ext));
        }

        ScopeDecision::Accept
    }

    /// Whether `path` is the scope directory or below it.
    fn contains_path(&self, path: &str) -> bool {
        path.starts_with(&self.base_path) || path == self.base_path.trim_end_matches('/')
    }

    /// First path segment below the scope directory, used as a category
    /// label when the page markup has none.
    pub fn path_category(&self, url: &Url) -> Option<String> {
        url.path()
            .strip_prefix(&self.base_path)?
            .split('/')
            .find(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Lowercased extension of the last path segment, if it names a
/// non-document resource.
fn resource_extension(path: &str) -> Option<String> {
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    NON_DOC_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

// ---------------------------------------------------------------------------
// PageFilter
// ---------------------------------------------------------------------------

/// Keyword and category predicates deciding whether a fetched page is kept.
#[derive(Debug, Clone, Default)]
pub struct PageFilter {
    filters: FiltersConfig,
}

impl PageFilter {
    /// Build from (possibly un-normalized) filter config.
    pub fn new(filters: &FiltersConfig) -> Self {
        Self {
            filters: filters.normalized(),
        }
    }

    /// Whether any predicate is configured.
    pub fn is_active(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Check a page by its URL, extracted text and category label.
    ///
    /// Exclude keywords win over include keywords; the keyword and category
    /// predicates must both pass. A page without a category label passes
    /// the category predicate.
    pub fn check(&self, url: &Url, text: &str, category: Option<&str>) -> ScopeDecision {
        let haystack = format!("{}\n{}", url.as_str(), text).to_lowercase();

        if let Some(keyword) = self
            .filters
            .not_contains
            .iter()
            .find(|k| haystack.contains(k.as_str()))
        {
            return ScopeDecision::Reject(RejectReason::ExcludedKeyword(keyword.clone()));
        }

        if !self.filters.contains.is_empty()
            && !self.filters.contains.iter().any(|k| haystack.contains(k.as_str()))
        {
            return ScopeDecision::Reject(RejectReason::MissingKeyword);
        }

        if let Some(label) = category {
            let label = label.to_lowercase();
            if !self.filters.categories.is_empty()
                && !self.filters.categories.iter().any(|c| label.contains(c.as_str()))
            {
                return ScopeDecision::Reject(RejectReason::Category(label));
            }
        }

        ScopeDecision::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn norm(s: &str) -> String {
        normalize(&url(s)).to_string()
    }

    #[test]
    fn normalize_variants_collapse() {
        let canonical = "https://docs.example.com/guide/intro";
        assert_eq!(norm("https://docs.example.com/guide/intro/"), canonical);
        assert_eq!(norm("https://DOCS.example.com:443/guide/intro#setup"), canonical);
        assert_eq!(norm("https://docs.example.com/guide//./intro"), canonical);
        assert_eq!(norm("https://docs.example.com/guide/x/../intro"), canonical);
        assert_eq!(norm("https://docs.example.com/guide/intro?utm_source=x&fbclid=1"), canonical);
    }

    #[test]
    fn normalize_keeps_root_slash_and_sorts_query() {
        assert_eq!(norm("https://a.test"), "https://a.test/");
        assert_eq!(norm("https://a.test/?b=2&a=1&gclid=z"), "https://a.test/?a=1&b=2");
        assert_eq!(norm("http://a.test:8080/x/"), "http://a.test:8080/x");
    }

    #[test]
    fn scope_uses_seed_directory() {
        let scope = CrawlScope::new(&url("https://docs.example.com/guide/"));
        assert_eq!(scope.base_path(), "/guide/");
        assert_eq!(CrawlScope::new(&url("https://docs.example.com/guide/intro")).base_path(), "/guide/");

        assert!(scope.check(&url("https://docs.example.com/guide/intro")).is_accept());
        assert!(scope.check(&url("https://docs.example.com/guide")).is_accept());
        assert_eq!(
            scope.check(&url("https://docs.example.com/blog/post")),
            ScopeDecision::Reject(RejectReason::OutsidePrefix)
        );
        assert_eq!(
            scope.check(&url("https://other.com/x")),
            ScopeDecision::Reject(RejectReason::Host("other.com".into()))
        );
    }

    #[test]
    fn scope_rejects_resources_and_schemes() {
        let scope = CrawlScope::new(&url("https://a.test/docs/"));
        assert_eq!(
            scope.check(&url("https://a.test/docs/manual.PDF")),
            ScopeDecision::Reject(RejectReason::Resource("pdf".into()))
        );
        assert!(!scope.check(&url("https://a.test/docs/app.js")).is_accept());
        assert!(!scope.check(&url("mailto:me@a.test")).is_accept());
        assert!(scope.check(&url("https://a.test/docs/v1.2/intro")).is_accept());
    }

    #[test]
    fn path_category_below_base() {
        let scope = CrawlScope::new(&url("https://a.test/docs/"));
        assert_eq!(scope.path_category(&url("https://a.test/docs/api/client")).as_deref(), Some("api"));
        assert_eq!(scope.path_category(&url("https://a.test/docs")), None);
    }

    #[test]
    fn exclude_wins_over_include() {
        let filter = PageFilter::new(&FiltersConfig {
            contains: vec!["Install".into()],
            not_contains: vec!["deprecated".into()],
            categories: vec![],
        });
        let page = url("https://a.test/docs/old");
        assert_eq!(
            filter.check(&page, "How to install. This API is DEPRECATED.", None),
            ScopeDecision::Reject(RejectReason::ExcludedKeyword("deprecated".into()))
        );
        assert!(filter.check(&page, "How to install", None).is_accept());
        assert_eq!(filter.check(&page, "Unrelated", None), ScopeDecision::Reject(RejectReason::MissingKeyword));
    }

    #[test]
    fn include_keyword_can_match_url() {
        let filter = PageFilter::new(&FiltersConfig {
            contains: vec!["install".into()],
            ..Default::default()
        });
        assert!(filter.check(&url("https://a.test/docs/install"), "text", None).is_accept());
    }

    #[test]
    fn category_filter_and_combined() {
        let filter = PageFilter::new(&FiltersConfig {
            contains: vec!["setup".into()],
            not_contains: vec![],
            categories: vec!["guide".into()],
        });
        let page = url("https://a.test/docs/x");
        assert!(filter.check(&page, "setup", Some("Guides")).is_accept());
        assert!(filter.check(&page, "setup", None).is_accept());
        assert!(!filter.check(&page, "setup", Some("Blog")).is_accept());
        assert!(!filter.check(&page, "other", Some("Guides")).is_accept());
    }
}

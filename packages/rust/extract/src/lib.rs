//! Content extraction: HTML page to structured blocks.
//!
//! [`extract`] parses a fetched page, locates its main content container with
//! the [`StrategyRegistry`], walks it into [`Block`]s, and collects the
//! title, category label and out-links.
//!
//! Extraction is synchronous. The parsed [`Html`] tree is not `Send`, so the
//! crawler calls this between awaits and only keeps the owned result.

mod blocks;
mod cleanup;
pub mod strategies;

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;
use webdoc_shared::{Block, PageContent, Result, WebdocError};

pub use strategies::{ContentStrategy, StrategyRegistry};

static REGISTRY: LazyLock<StrategyRegistry> = LazyLock::new(StrategyRegistry::new);

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head title, title").expect("title selector"));

static BASE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("base selector"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

/// Breadcrumb / active-navigation markup holding a category label, by priority.
static CATEGORY_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [".breadcrumbs", ".nav-item.active", ".sidebar .active", "header .category"]
        .iter()
        .map(|s| Selector::parse(s).expect("category selector"))
        .collect()
});

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Everything extracted from one page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Title from `<title>`, first heading, or last URL segment.
    pub title: String,
    /// Content blocks in document order.
    pub blocks: Vec<Block>,
    /// Absolute, fragment-free http(s) links from the whole document.
    pub links: Vec<Url>,
    /// Category label from breadcrumb / active-nav markup.
    pub category: Option<String>,
    /// Name of the strategy that located the content.
    pub strategy: &'static str,
}

impl ExtractedPage {
    /// Concatenated text of title and blocks, used by keyword filters.
    pub fn text(&self) -> String {
        let mut text = self.title.clone();
        for block in &self.blocks {
            let block_text = block.text();
            if !block_text.is_empty() {
                text.push('\n');
                text.push_str(block_text);
            }
        }
        text
    }

    /// Turn into the immutable [`PageContent`] stored in the document.
    pub fn into_page(self, url: &Url, depth: u32, category: Option<String>) -> PageContent {
        PageContent {
            url: url.to_string(),
            title: self.title,
            depth,
            category,
            blocks: self.blocks,
            links: self.links.into_iter().map(String::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract title, blocks, category and links from a page.
///
/// Fails only when no content-bearing element can be located.
#[instrument(skip(html), fields(url = %url))]
pub fn extract(html: &str, url: &Url) -> Result<ExtractedPage> {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, url);

    let located = REGISTRY
        .locate(&doc)
        .ok_or_else(|| WebdocError::extraction(url.as_str(), "no content container found"))?;

    let blocks = blocks::BlockWalker::new(&base, located.strategy.boilerplate()).walk(located.root);
    let title = page_title(&doc, &blocks, url);
    let category = category_label(&doc);
    let links = collect_links(&doc, &base);

    debug!(
        strategy = located.strategy.name(),
        blocks = blocks.len(),
        links = links.len(),
        "page extracted"
    );

    Ok(ExtractedPage {
        title,
        blocks,
        links,
        category,
        strategy: located.strategy.name(),
    })
}

/// Collect only the out-links of a page, without content extraction.
pub fn extract_links(html: &str, url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let base = document_base(&doc, url);
    collect_links(&doc, &base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The page URL, or `<base href>` resolved against it.
fn document_base(doc: &Html, url: &Url) -> Url {
    doc.select(&BASE_SEL)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| url.join(href.trim()).ok())
        .unwrap_or_else(|| url.clone())
}

fn page_title(doc: &Html, blocks: &[Block], url: &Url) -> String {
    let from_title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|el| cleanup::clean_inline(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());
    if let Some(title) = from_title {
        return title;
    }

    let from_heading = blocks.iter().find_map(|b| match b {
        Block::Heading { text, .. } => Some(text.clone()),
        _ => None,
    });
    if let Some(title) = from_heading {
        return title;
    }

    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn category_label(doc: &Html) -> Option<String> {
    CATEGORY_SELECTORS.iter().find_map(|sel| {
        doc.select(sel)
            .map(|el| cleanup::collapse_whitespace(&el.text().collect::<String>()))
            .find(|text| !text.is_empty())
    })
}

fn collect_links(doc: &Html, base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links: Vec<Url> = Vec::new();
    for el in doc.select(&ANCHOR_SEL) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let Ok(mut link) = base.join(href) else {
            continue;
        };
        if !matches!(link.scheme(), "http" | "https") {
            continue;
        }
        link.set_fragment(None);
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn headings(page: &ExtractedPage) -> Vec<&str> {
        page.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn extract_docusaurus_fixture() {
        let html = load_fixture("html/docusaurus.html");
        let page = extract(&html, &url("https://docs.example.com/guide/intro")).unwrap();

        assert_eq!(page.strategy, "docusaurus");
        assert_eq!(page.title, "Introduction | Example Docs");
        assert_eq!(headings(&page), vec!["Introduction", "Installation", "Next steps"]);
        assert!(page.blocks.iter().any(|b| matches!(
            b,
            Block::Code { language: Some(lang), text } if lang == "bash" && text == "npm install example"
        )));
        // Sidebar, edit link and pagination are gone.
        let text = page.text();
        assert!(!text.contains("Edit this page"));
        assert!(!text.contains("Previous"));
        assert!(!text.contains("Sidebar entry"));
        assert_eq!(page.category.as_deref(), Some("Guides"));
    }

    #[test]
    fn extract_vitepress_fixture() {
        let html = load_fixture("html/vitepress.html");
        let page = extract(&html, &url("https://vp.example.com/guide/getting-started")).unwrap();

        assert_eq!(page.strategy, "vitepress");
        assert_eq!(headings(&page), vec!["Getting Started", "Prerequisites"]);
        assert!(page.blocks.contains(&Block::ListItem {
            level: 1,
            text: "Node.js version 18 or higher.".into()
        }));
    }

    #[test]
    fn extract_gitbook_fixture() {
        let html = load_fixture("html/gitbook.html");
        let page = extract(&html, &url("https://book.example.com/chapter-1")).unwrap();

        assert_eq!(page.strategy, "gitbook");
        assert_eq!(headings(&page), vec!["Chapter 1"]);
        assert!(!page.text().contains("Next chapter"));
    }

    #[test]
    fn extract_readthedocs_fixture() {
        let html = load_fixture("html/readthedocs.html");
        let page = extract(&html, &url("https://proj.readthedocs.io/en/latest/usage.html")).unwrap();

        assert_eq!(page.strategy, "readthedocs");
        assert_eq!(headings(&page), vec!["Usage", "Configuration"]);
        assert!(page.blocks.iter().any(|b| matches!(
            b,
            Block::Code { language: Some(lang), .. } if lang == "python"
        )));
        assert!(page.blocks.contains(&Block::Paragraph {
            text: "timeout | int | 10".into()
        }));
    }

    #[test]
    fn extract_generic_fixture() {
        let html = load_fixture("html/generic.html");
        let page = extract(&html, &url("https://site.example.com/docs/page")).unwrap();

        assert_eq!(page.strategy, "semantic");
        assert!(page.blocks.iter().any(|b| matches!(b, Block::Image(img)
            if img.src == "https://site.example.com/docs/images/diagram.png" && img.alt == "Diagram")));
        assert!(page.blocks.contains(&Block::Link {
            text: "Read the API reference".into(),
            url: "https://site.example.com/docs/api".into(),
        }));
        assert!(!page.text().contains("Cookie"));
    }

    #[test]
    fn links_honor_base_and_strip_fragments() {
        let html = r##"<html><head><base href="https://a.test/docs/v2/"></head><body>
            <a href="intro#top">Intro</a>
            <a href="/other">Other</a>
            <a href="#local">Local</a>
            <a href="mailto:me@a.test">Mail</a>
            <a href="intro">Intro again</a>
            <main><p>x</p></main></body></html>"##;
        let links = extract_links(html, &url("https://a.test/page"));
        let links: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(links, vec!["https://a.test/docs/v2/intro", "https://a.test/other"]);
    }

    #[test]
    fn title_fallbacks() {
        let page = extract(
            "<html><body><main><h2>First heading</h2></main></body></html>",
            &url("https://a.test/docs/x"),
        )
        .unwrap();
        assert_eq!(page.title, "First heading");

        let page = extract(
            "<html><body><main><p>No headings</p></main></body></html>",
            &url("https://a.test/docs/last-part/"),
        )
        .unwrap();
        assert_eq!(page.title, "last-part");

        let page = extract("<html><body><main><p>Root</p></main></body></html>", &url("https://a.test/")).unwrap();
        assert_eq!(page.title, "a.test");
    }

    #[test]
    fn empty_page_is_extraction_error() {
        let err = extract("<html><head><title>t</title></head><body></body></html>", &url("https://a.test/"))
            .unwrap_err();
        assert!(matches!(err, WebdocError::Extraction { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn into_page_carries_metadata() {
        let page = extract(
            r#"<html><body><main><h1>T</h1><a href="/next">Next</a></main></body></html>"#,
            &url("https://a.test/docs/"),
        )
        .unwrap();
        let content = page.into_page(&url("https://a.test/docs"), 2, Some("docs".into()));
        assert_eq!(content.depth, 2);
        assert_eq!(content.links, vec!["https://a.test/next".to_string()]);
        assert_eq!(content.category.as_deref(), Some("docs"));
    }
}

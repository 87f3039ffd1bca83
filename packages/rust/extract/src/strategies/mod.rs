//! Content strategy trait and built-in strategies for locating the main
//! content container of a page.
//!
//! Platform strategies (Docusaurus, VitePress, GitBook, Read the Docs) detect
//! their generator by meta tags or markup signature. When none applies, or the
//! detected platform's container is missing, semantic containers are tried,
//! then a text-density heuristic.

mod density;
mod docusaurus;
mod gitbook;
mod readthedocs;
mod semantic;
mod vitepress;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub use density::DensityStrategy;
pub use docusaurus::DocusaurusStrategy;
pub use gitbook::GitBookStrategy;
pub use readthedocs::ReadTheDocsStrategy;
pub use semantic::SemanticStrategy;
pub use vitepress::VitePressStrategy;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A way of finding the primary content container in a parsed page.
///
/// Strategies are tried in priority order; [`DensityStrategy`] is the
/// always-last fallback.
pub trait ContentStrategy: Send + Sync {
    /// Whether this strategy applies to the document.
    fn detect(&self, doc: &Html) -> bool;

    /// Locate the content container.
    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>>;

    /// Platform-specific boilerplate to skip inside the container, in
    /// addition to the generic skip rules.
    fn boilerplate(&self) -> Option<&Selector> {
        None
    }

    /// Strategy name for tracing and crawl reports.
    fn name(&self) -> &'static str;
}

/// A located content container and the strategy that found it.
pub struct Located<'a, 's> {
    pub root: ElementRef<'a>,
    pub strategy: &'s dyn ContentStrategy,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered strategies in priority order.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn ContentStrategy>>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in strategies (platforms first,
    /// semantic next, density last).
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(DocusaurusStrategy),
                Box::new(VitePressStrategy),
                Box::new(GitBookStrategy),
                Box::new(ReadTheDocsStrategy),
                Box::new(SemanticStrategy),
                Box::new(DensityStrategy),
            ],
        }
    }

    /// Find the content container using the first strategy that both applies
    /// and locates something.
    pub fn locate<'a, 's>(&'s self, doc: &'a Html) -> Option<Located<'a, 's>> {
        for strategy in &self.strategies {
            if !strategy.detect(doc) {
                continue;
            }
            match strategy.locate(doc) {
                Some(root) => {
                    return Some(Located {
                        root,
                        strategy: strategy.as_ref(),
                    });
                }
                None => debug!(strategy = strategy.name(), "detected but no container found"),
            }
        }
        None
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by strategies
// ---------------------------------------------------------------------------

/// Whether `doc` carries `<meta name="generator">` mentioning `needle`.
pub(crate) fn generator_contains(doc: &Html, needle: &str) -> bool {
    static GENERATOR_SEL: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"meta[name="generator"]"#).expect("generator selector")
    });

    doc.select(&GENERATOR_SEL).any(|el| {
        el.value()
            .attr("content")
            .is_some_and(|content| content.to_lowercase().contains(needle))
    })
}

/// Whether any element matches the CSS selector.
pub(crate) fn has_match(doc: &Html, selector: &str) -> bool {
    Selector::parse(selector)
        .map(|sel| doc.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// First element matching any of `selectors` (in order) that holds text.
pub(crate) fn first_with_text<'a>(doc: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel_str| {
        let sel = Selector::parse(sel_str).ok()?;
        doc.select(&sel)
            .find(|el| el.text().any(|t| !t.trim().is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_prefers_platform() {
        let html = Html::parse_document(
            r#"<html><head><meta name="generator" content="Docusaurus v3.1.0"></head>
            <body><main><article><div class="theme-doc-markdown markdown"><h1>Hi</h1></div></article></main></body></html>"#,
        );
        let registry = StrategyRegistry::new();
        let located = registry.locate(&html).unwrap();
        assert_eq!(located.strategy.name(), "docusaurus");
        assert!(located.root.value().classes().any(|c| c == "theme-doc-markdown"));
    }

    #[test]
    fn registry_falls_through_to_semantic() {
        let html = Html::parse_document(
            r#"<html><head><meta name="generator" content="VitePress"></head>
            <body><article><p>Plain article</p></article></body></html>"#,
        );
        let registry = StrategyRegistry::new();
        let located = registry.locate(&html).unwrap();
        assert_eq!(located.strategy.name(), "semantic");
    }

    #[test]
    fn registry_density_fallback() {
        let html = Html::parse_document(
            r#"<html><body>
            <div class="menu"><a href="/a">A</a><a href="/b">B</a></div>
            <div class="body-text"><p>Lots of real text lives in this container.</p><p>More text.</p></div>
            </body></html>"#,
        );
        let registry = StrategyRegistry::new();
        let located = registry.locate(&html).unwrap();
        assert_eq!(located.strategy.name(), "density");
        assert!(located.root.value().classes().any(|c| c == "body-text"));
    }

    #[test]
    fn registry_nothing_on_empty_page() {
        let html = Html::parse_document("<html><head><title>x</title></head><body></body></html>");
        assert!(StrategyRegistry::new().locate(&html).is_none());
    }
}

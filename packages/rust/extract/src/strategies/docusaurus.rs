//! Docusaurus content strategy.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ContentStrategy, first_with_text, generator_contains, has_match};

/// Edit links, prev/next pagination and the mobile TOC toggle.
static BOILERPLATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        ".theme-doc-footer, .pagination-nav, .theme-doc-toc-mobile, .theme-edit-this-page, \
         .theme-last-updated, .hash-link",
    )
    .expect("docusaurus boilerplate selector")
});

/// Locates content on Docusaurus-powered documentation sites.
pub struct DocusaurusStrategy;

impl ContentStrategy for DocusaurusStrategy {
    fn detect(&self, doc: &Html) -> bool {
        // <meta name="generator" content="Docusaurus v3.x">
        generator_contains(doc, "docusaurus")
            || has_match(doc, "[data-docusaurus-version]")
            || has_match(doc, ".theme-doc-markdown")
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        first_with_text(
            doc,
            &[".theme-doc-markdown", "article .markdown", "article", ".markdown", "main"],
        )
    }

    fn boilerplate(&self) -> Option<&Selector> {
        Some(&BOILERPLATE)
    }

    fn name(&self) -> &'static str {
        "docusaurus"
    }
}

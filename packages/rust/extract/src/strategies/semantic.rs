//! Semantic container strategy.
//!
//! Applies to every page. Picks the first of `main`, `article`,
//! `[role=main]`, `.content`, `#content` that holds any text.

use scraper::{ElementRef, Html};

use super::{ContentStrategy, first_with_text};

const SELECTORS: &[&str] = &["main", "article", r#"[role="main"]"#, ".content", "#content"];

/// Locates content through HTML5 landmark elements and common ids/classes.
pub struct SemanticStrategy;

impl ContentStrategy for SemanticStrategy {
    fn detect(&self, _doc: &Html) -> bool {
        true
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        first_with_text(doc, SELECTORS)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

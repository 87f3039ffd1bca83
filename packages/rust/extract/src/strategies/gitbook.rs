//! GitBook content strategy.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ContentStrategy, first_with_text, generator_contains, has_match};

static BOILERPLATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".page-footer, .navigation, .navigation-prev, .navigation-next")
        .expect("gitbook boilerplate selector")
});

/// Locates content on GitBook-powered documentation sites.
pub struct GitBookStrategy;

impl ContentStrategy for GitBookStrategy {
    fn detect(&self, doc: &Html) -> bool {
        generator_contains(doc, "gitbook")
            || has_match(doc, r#"meta[name="gitbook"]"#)
            || has_match(doc, ".gitbook-root")
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        first_with_text(
            doc,
            &[".markdown-section", ".page-inner section", "main section", "main"],
        )
    }

    fn boilerplate(&self) -> Option<&Selector> {
        Some(&BOILERPLATE)
    }

    fn name(&self) -> &'static str {
        "gitbook"
    }
}

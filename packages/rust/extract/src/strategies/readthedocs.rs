//! Read the Docs (Sphinx) content strategy.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ContentStrategy, first_with_text, generator_contains, has_match};

/// Permalink markers, prev/next buttons and the breadcrumb bar.
static BOILERPLATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".headerlink, .rst-footer-buttons, .wy-breadcrumbs, .rst-versions")
        .expect("readthedocs boilerplate selector")
});

/// Locates content on Read the Docs / Sphinx documentation sites.
pub struct ReadTheDocsStrategy;

impl ContentStrategy for ReadTheDocsStrategy {
    fn detect(&self, doc: &Html) -> bool {
        has_match(doc, r#"meta[name="readthedocs"]"#)
            || generator_contains(doc, "sphinx")
            || has_match(doc, ".wy-nav-side")
            || has_match(doc, ".wy-body-for-nav")
            // _static/ asset paths are a common Sphinx marker
            || has_match(doc, r#"link[href*="_static/"]"#)
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        first_with_text(
            doc,
            &[
                r#"[itemprop="articleBody"]"#,
                r#".rst-content [role="main"]"#,
                r#"[role="main"]"#,
                ".document",
                "main",
            ],
        )
    }

    fn boilerplate(&self) -> Option<&Selector> {
        Some(&BOILERPLATE)
    }

    fn name(&self) -> &'static str {
        "readthedocs"
    }
}

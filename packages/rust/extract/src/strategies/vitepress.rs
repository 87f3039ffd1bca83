//! VitePress content strategy.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ContentStrategy, first_with_text, generator_contains, has_match};

static BOILERPLATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".header-anchor, .VPDocFooter, .edit-link, .prev-next, .VPDocAside, span.lang")
        .expect("vitepress boilerplate selector")
});

/// Locates content on VitePress-powered documentation sites.
pub struct VitePressStrategy;

impl ContentStrategy for VitePressStrategy {
    fn detect(&self, doc: &Html) -> bool {
        generator_contains(doc, "vitepress") || has_match(doc, "#VPContent") || has_match(doc, ".VPDoc")
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        // VitePress renders page markdown into .vp-doc
        first_with_text(doc, &[".vp-doc", ".VPDoc", "#VPContent main", "main"])
    }

    fn boilerplate(&self) -> Option<&Selector> {
        Some(&BOILERPLATE)
    }

    fn name(&self) -> &'static str {
        "vitepress"
    }
}

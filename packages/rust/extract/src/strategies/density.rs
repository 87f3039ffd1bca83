//! Text-density fallback strategy.
//!
//! Scores every block container by the amount of non-link text it holds
//! directly (text inside nested containers counts for the nested container,
//! not the outer one) and picks the highest-scoring one.

use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use super::ContentStrategy;
use crate::blocks::is_boilerplate;

/// Elements that can be chosen as the content container.
static CANDIDATES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body, main, article, section, div, td").expect("density candidate selector")
});

static BODY_IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body img").expect("body img selector"));

/// Tags that start a new scoring scope.
const CONTAINER_TAGS: &[&str] = &["body", "main", "article", "section", "div", "td", "table", "aside", "nav"];

/// Picks the element with the largest direct non-link text mass.
pub struct DensityStrategy;

impl ContentStrategy for DensityStrategy {
    fn detect(&self, _doc: &Html) -> bool {
        true
    }

    fn locate<'a>(&self, doc: &'a Html) -> Option<ElementRef<'a>> {
        let mut best: Option<(usize, ElementRef<'a>)> = None;
        for el in doc.select(&CANDIDATES) {
            if is_boilerplate(el, None) {
                continue;
            }
            let mass = direct_mass(el);
            if mass > 0 && best.is_none_or(|(score, _)| mass > score) {
                best = Some((mass, el));
            }
        }

        if let Some((_, el)) = best {
            return Some(el);
        }

        // Image-only pages still have content.
        let img = doc.select(&BODY_IMG).next()?;
        img.ancestors().filter_map(ElementRef::wrap).find(|el| el.value().name() == "body")
    }

    fn name(&self) -> &'static str {
        "density"
    }
}

/// Non-link text directly held by `el`, excluding nested containers.
fn direct_mass(el: ElementRef<'_>) -> usize {
    el.children()
        .map(|child| match child.value() {
            Node::Text(text) => text.trim().chars().count(),
            Node::Element(element) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    return 0;
                };
                if CONTAINER_TAGS.contains(&element.name()) {
                    0
                } else {
                    text_mass(child_el)
                }
            }
            _ => 0,
        })
        .sum()
}

/// Non-link, non-boilerplate text below `el`.
fn text_mass(el: ElementRef<'_>) -> usize {
    if el.value().name() == "a" || is_boilerplate(el, None) {
        return 0;
    }
    el.children()
        .map(|child| match child.value() {
            Node::Text(text) => text.trim().chars().count(),
            Node::Element(_) => ElementRef::wrap(child).map_or(0, text_mass),
            _ => 0,
        })
        .sum()
}

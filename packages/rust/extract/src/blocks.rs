//! Walks a content container and converts it into [`Block`]s in document order.
//!
//! Block-level elements flush the pending inline run; inline elements and text
//! nodes append to it. A flushed run whose only content is a single anchor
//! becomes a [`Block::Link`], anything else a [`Block::Paragraph`].

use scraper::node::Node;
use scraper::{ElementRef, Selector};
use url::Url;
use webdoc_shared::{Block, ImageRef};

use crate::cleanup::{clean_code, clean_inline, code_language};

// ---------------------------------------------------------------------------
// Boilerplate
// ---------------------------------------------------------------------------

/// Tags never walked.
const SKIP_TAGS: &[&str] = &[
    "nav", "footer", "aside", "script", "style", "noscript", "template", "form", "button",
    "input", "select", "textarea", "option", "svg", "iframe", "canvas", "object", "embed",
    "link", "meta", "head",
];

/// ARIA roles marking page chrome.
const SKIP_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "complementary", "search"];

/// Class names marking page chrome.
const SKIP_CLASSES: &[&str] = &[
    "sidebar", "navbar", "footer", "header", "cookie-banner", "announcement",
    "announcement-bar", "edit-this-page", "edit-page", "pagination", "pagination-nav",
    "prev-next", "breadcrumbs", "skip-link", "visually-hidden", "sr-only",
];

/// Whether `el` is navigation, chrome or otherwise not content.
///
/// A `<header>` is chrome unless it wraps a heading (article headers often
/// hold the page's `<h1>`).
pub(crate) fn is_boilerplate(el: ElementRef<'_>, extra: Option<&Selector>) -> bool {
    let value = el.value();
    let name = value.name();

    if SKIP_TAGS.contains(&name) {
        return true;
    }
    if name == "header" && !contains_heading(el) {
        return true;
    }
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    if value.attr("role").is_some_and(|role| SKIP_ROLES.contains(&role)) {
        return true;
    }
    if value.classes().any(|class| SKIP_CLASSES.contains(&class)) {
        return true;
    }
    extra.is_some_and(|sel| sel.matches(&el))
}

fn contains_heading(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| heading_level(e.value().name()).is_some())
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Inline formatting elements whose text joins the surrounding run.
const INLINE_TAGS: &[&str] = &[
    "span", "code", "em", "strong", "b", "i", "u", "s", "del", "ins", "kbd", "samp", "var",
    "small", "sub", "sup", "mark", "abbr", "cite", "q", "time", "label", "dfn", "bdi", "bdo",
    "wbr", "tt", "font",
];

// ---------------------------------------------------------------------------
// Walker
// ---------------------------------------------------------------------------

/// Pending inline text and the anchors it contains.
#[derive(Default)]
struct InlineRun {
    text: String,
    anchors: Vec<(String, String)>,
    /// Set when non-whitespace text outside any anchor was appended.
    loose_text: bool,
}

/// Converts one content container into blocks.
pub(crate) struct BlockWalker<'s> {
    base: &'s Url,
    extra: Option<&'s Selector>,
    blocks: Vec<Block>,
    run: InlineRun,
    list_depth: u8,
}

impl<'s> BlockWalker<'s> {
    /// `base` resolves relative hrefs/srcs; `extra` is strategy-specific boilerplate.
    pub(crate) fn new(base: &'s Url, extra: Option<&'s Selector>) -> Self {
        Self {
            base,
            extra,
            blocks: Vec::new(),
            run: InlineRun::default(),
            list_depth: 0,
        }
    }

    /// Walk the children of `root` and return the collected blocks.
    pub(crate) fn walk(mut self, root: ElementRef<'_>) -> Vec<Block> {
        self.walk_children(root);
        self.flush();
        self.blocks
    }

    fn walk_children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text, false),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.visit(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, el: ElementRef<'_>) {
        if is_boilerplate(el, self.extra) {
            return;
        }

        let name = el.value().name();
        if let Some(level) = heading_level(name) {
            self.flush();
            let text = clean_inline(&self.text_of(el));
            if !text.is_empty() {
                self.blocks.push(Block::Heading { level, text });
            }
            return;
        }

        match name {
            "a" => self.visit_anchor(el),
            "br" => self.run.text.push(' '),
            "img" => {
                self.flush();
                if let Some(image) = self.image_ref(el) {
                    self.blocks.push(Block::Image(image));
                }
            }
            "pre" => {
                self.flush();
                let text = clean_code(&el.text().collect::<String>());
                if !text.is_empty() {
                    self.blocks.push(Block::Code {
                        language: code_block_language(el),
                        text,
                    });
                }
            }
            "ul" | "ol" | "menu" => {
                self.flush();
                self.list_depth = self.list_depth.saturating_add(1);
                self.walk_children(el);
                self.flush();
                self.list_depth -= 1;
            }
            "li" => self.visit_list_item(el),
            "table" => self.visit_table(el),
            "hr" => self.flush(),
            _ if INLINE_TAGS.contains(&name) => self.walk_children(el),
            // p, div, section, blockquote, figure, dl and anything unknown:
            // flattened into the blocks of their children.
            _ => {
                self.flush();
                self.walk_children(el);
                self.flush();
            }
        }
    }

    fn visit_anchor(&mut self, el: ElementRef<'_>) {
        let text = self.text_of(el);
        let href = el
            .value()
            .attr("href")
            .and_then(|href| self.resolve_link(href));

        match href {
            Some(url) if !clean_inline(&text).is_empty() => {
                self.run.anchors.push((clean_inline(&text), url));
                self.push_text(&text, true);
            }
            _ => self.walk_children(el),
        }
    }

    fn visit_list_item(&mut self, el: ElementRef<'_>) {
        self.flush();

        // Own text first, nested lists and blocks afterwards.
        let mut own = String::new();
        let mut nested: Vec<ElementRef<'_>> = Vec::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => own.push_str(text),
                Node::Element(element) => {
                    let Some(child_el) = ElementRef::wrap(child) else { continue };
                    if is_boilerplate(child_el, self.extra) {
                        continue;
                    }
                    if matches!(element.name(), "ul" | "ol" | "pre" | "img" | "table")
                        || child_el.descendants().filter_map(ElementRef::wrap).any(|d| {
                            matches!(d.value().name(), "ul" | "ol" | "pre" | "img")
                        })
                    {
                        nested.push(child_el);
                    } else {
                        own.push(' ');
                        own.push_str(&self.text_of(child_el));
                    }
                }
                _ => {}
            }
        }

        let text = clean_inline(&own);
        if !text.is_empty() {
            self.blocks.push(Block::ListItem {
                level: self.list_depth.max(1),
                text,
            });
        }
        for child in nested {
            self.visit(child);
        }
        self.flush();
    }

    fn visit_table(&mut self, el: ElementRef<'_>) {
        self.flush();
        for row in el
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
        {
            let cells: Vec<String> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|c| clean_inline(&self.text_of(c)))
                .collect();
            if cells.iter().any(|c| !c.is_empty()) {
                self.blocks.push(Block::Paragraph {
                    text: cells.join(" | "),
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inline run handling
    // -----------------------------------------------------------------------

    fn push_text(&mut self, text: &str, in_anchor: bool) {
        if !in_anchor && !text.trim().is_empty() {
            self.run.loose_text = true;
        }
        self.run.text.push_str(text);
    }

    /// Emit the pending inline run as a Link or Paragraph block.
    fn flush(&mut self) {
        let mut run = std::mem::take(&mut self.run);
        let text = clean_inline(&run.text);
        if text.is_empty() {
            return;
        }

        if run.anchors.len() == 1 && !run.loose_text {
            if let Some((text, url)) = run.anchors.pop() {
                self.blocks.push(Block::Link { text, url });
                return;
            }
        }
        self.blocks.push(Block::Paragraph { text });
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Text below `el`, skipping boilerplate.
    fn text_of(&self, el: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in el.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => {
                    let Some(child_el) = ElementRef::wrap(child) else { continue };
                    if is_boilerplate(child_el, self.extra) {
                        continue;
                    }
                    if element.name() == "br" {
                        out.push(' ');
                    } else {
                        out.push_str(&self.text_of(child_el));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Resolve an anchor target; only web and mail links become Link targets.
    fn resolve_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let mut url = self.base.join(href).ok()?;
        if !matches!(url.scheme(), "http" | "https" | "mailto") {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    fn image_ref(&self, el: ElementRef<'_>) -> Option<ImageRef> {
        let value = el.value();
        let raw = value
            .attr("src")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| value.attr("data-src"))
            .or_else(|| {
                value
                    .attr("srcset")
                    .and_then(|set| set.split(',').next())
                    .and_then(|candidate| candidate.split_whitespace().next())
            })?;
        let src = self.base.join(raw.trim()).ok()?;
        Some(ImageRef {
            src: src.to_string(),
            alt: clean_inline(value.attr("alt").unwrap_or_default()),
            asset: None,
        })
    }
}

/// Language hint for a `<pre>`: classes on the pre, its `code` child and its
/// wrapper, then `data-lang` / `data-language` on any of them.
fn code_block_language(pre: ElementRef<'_>) -> Option<String> {
    let code = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "code");
    let wrapper = pre.parent().and_then(ElementRef::wrap);
    let wrapper_outer = wrapper.and_then(|w| w.parent()).and_then(ElementRef::wrap);
    let candidates: Vec<ElementRef<'_>> = [Some(pre), code, wrapper, wrapper_outer]
        .into_iter()
        .flatten()
        .collect();

    candidates
        .iter()
        .find_map(|el| el.value().classes().find_map(code_language))
        .or_else(|| {
            candidates.iter().find_map(|el| {
                el.value()
                    .attr("data-lang")
                    .or_else(|| el.value().attr("data-language"))
                    .map(|lang| lang.trim().to_lowercase())
                    .filter(|lang| !lang.is_empty())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn walk(body: &str) -> Vec<Block> {
        let html = Html::parse_document(&format!("<html><body><main>{body}</main></body></html>"));
        let sel = Selector::parse("main").unwrap();
        let root = html.select(&sel).next().unwrap();
        let base = Url::parse("https://docs.example.com/guide/intro").unwrap();
        BlockWalker::new(&base, None).walk(root)
    }

    #[test]
    fn headings_and_paragraphs() {
        let blocks = walk("<h1>Intro</h1><p>Hello <b>world</b>.</p><h2>Setup</h2>");
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 1, text: "Intro".into() },
                Block::Paragraph { text: "Hello world.".into() },
                Block::Heading { level: 2, text: "Setup".into() },
            ]
        );
    }

    #[test]
    fn lone_anchor_becomes_link() {
        let blocks = walk(r#"<p><a href="../api/">API reference</a></p><p>See <a href="x">x</a> too.</p>"#);
        assert_eq!(
            blocks[0],
            Block::Link {
                text: "API reference".into(),
                url: "https://docs.example.com/api/".into(),
            }
        );
        assert_eq!(blocks[1], Block::Paragraph { text: "See x too.".into() });
    }

    #[test]
    fn code_blocks_keep_whitespace_and_language() {
        let blocks = walk(
            r#"<div class="highlight-python"><pre>def f():
    return 1
</pre></div><pre><code class="language-rust">fn main() {}</code></pre><pre data-lang="bash">ls</pre>"#,
        );
        assert_eq!(
            blocks,
            vec![
                Block::Code { language: Some("python".into()), text: "def f():\n    return 1".into() },
                Block::Code { language: Some("rust".into()), text: "fn main() {}".into() },
                Block::Code { language: Some("bash".into()), text: "ls".into() },
            ]
        );
    }

    #[test]
    fn nested_lists_have_levels() {
        let blocks = walk("<ul><li>One<ul><li>One.a</li></ul></li><li>Two</li></ul><ol><li>First</li></ol>");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem { level: 1, text: "One".into() },
                Block::ListItem { level: 2, text: "One.a".into() },
                Block::ListItem { level: 1, text: "Two".into() },
                Block::ListItem { level: 1, text: "First".into() },
            ]
        );
    }

    #[test]
    fn tables_become_rows() {
        let blocks = walk(
            "<table><thead><tr><th>Name</th><th>Type</th></tr></thead>\
             <tbody><tr><td>id</td><td>u64</td></tr><tr><td></td><td></td></tr></tbody></table>",
        );
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph { text: "Name | Type".into() },
                Block::Paragraph { text: "id | u64".into() },
            ]
        );
    }

    #[test]
    fn images_resolve_and_split_paragraphs() {
        let blocks = walk(r#"<p>Before <img src="img/arch.svg" alt="Architecture"> after</p><img data-src="/lazy.png">"#);
        assert_eq!(blocks[0], Block::Paragraph { text: "Before".into() });
        assert_eq!(
            blocks[1],
            Block::Image(ImageRef {
                src: "https://docs.example.com/guide/img/arch.svg".into(),
                alt: "Architecture".into(),
                asset: None,
            })
        );
        assert_eq!(blocks[2], Block::Paragraph { text: "after".into() });
        assert!(matches!(&blocks[3], Block::Image(img) if img.src == "https://docs.example.com/lazy.png"));
    }

    #[test]
    fn boilerplate_is_skipped() {
        let blocks = walk(
            r#"<nav>Menu</nav><div class="sidebar">Side</div><div role="navigation">Nav</div>
               <p>Kept</p><footer>Foot</footer><script>var x;</script><button>Copy</button>"#,
        );
        assert_eq!(blocks, vec![Block::Paragraph { text: "Kept".into() }]);
    }

    #[test]
    fn article_header_with_heading_is_kept() {
        let blocks = walk("<header><h1>Title</h1></header><header>Site banner</header><p>Body</p>");
        assert_eq!(
            blocks,
            vec![
                Block::Heading { level: 1, text: "Title".into() },
                Block::Paragraph { text: "Body".into() },
            ]
        );
    }

    #[test]
    fn unknown_elements_flatten_to_text() {
        let blocks = walk("<custom-note><em>Note:</em> be careful</custom-note><dl><dt>Term</dt><dd>Def</dd></dl>");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph { text: "Note: be careful".into() },
                Block::Paragraph { text: "Term".into() },
                Block::Paragraph { text: "Def".into() },
            ]
        );
    }

    #[test]
    fn heading_permalinks_removed() {
        let blocks = walk(r##"<h2>Install<a class="headerlink" href="#install">¶</a></h2>"##);
        assert_eq!(blocks, vec![Block::Heading { level: 2, text: "Install".into() }]);
    }
}

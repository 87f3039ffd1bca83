//! Single-file HTML renderer with embedded stylesheet and inlined images.

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use webdoc_shared::{
    Block, Document, OutputFormat, PageContent, Result, TocEntry, TocNode, heading_anchors, page_anchor,
};

use crate::{RenderOptions, Renderer};

const STYLESHEET: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; line-height: 1.6; color: #222; max-width: 52rem; margin: 2rem auto; padding: 0 1rem; }
h1, h2, h3, h4, h5, h6 { line-height: 1.25; margin-top: 1.6em; }
a { color: #0b5cad; }
.doc-header { border-bottom: 2px solid #ddd; margin-bottom: 2rem; }
.doc-header .meta, .page .source { color: #777; font-size: 0.85rem; }
.toc ul { list-style: none; padding-left: 1.2rem; }
.toc > ul { padding-left: 0; }
.page { border-top: 1px solid #eee; padding-top: 1rem; }
.page-title { font-size: 1.9rem; margin-bottom: 0.2rem; }
pre { background: #f5f5f5; border: 1px solid #e2e2e2; border-radius: 4px; padding: 0.8rem; overflow-x: auto; }
code { font-family: "SFMono-Regular", Consolas, "Liberation Mono", monospace; font-size: 0.9em; }
figure { margin: 1rem 0; }
figure img { max-width: 100%; height: auto; }
figcaption { color: #666; font-size: 0.85rem; }
@media print { .page { page-break-before: always; border-top: none; } .page:first-of-type { page-break-before: auto; } }
"#;

/// Renders a self-contained HTML file.
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn render(&self, doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(16 * 1024);
        let title = escape(&doc.title);

        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        let _ = writeln!(out, "<meta name=\"generator\" content=\"webdoc {}\">", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(out, "<title>{title}</title>");
        let _ = writeln!(out, "<style>{STYLESHEET}</style>\n</head>\n<body>");

        let _ = writeln!(
            out,
            "<header class=\"doc-header\">\n<h1>{title}</h1>\n<p class=\"meta\">Generated from <a href=\"{src}\">{src}</a> on {date}</p>\n</header>",
            src = escape(&doc.source_url),
            date = doc.generated_at.format("%Y-%m-%d %H:%M UTC"),
        );

        if let Some(entries) = toc.filter(|e| !e.is_empty()) {
            out.push_str("<nav class=\"toc\">\n<h2>Table of contents</h2>\n");
            write_toc(&mut out, &TocNode::tree(entries));
            out.push_str("</nav>\n");
        }

        out.push_str("<main>\n");
        for (idx, page) in doc.pages.iter().enumerate() {
            write_page(&mut out, doc, page, idx, opts);
        }
        out.push_str("</main>\n</body>\n</html>\n");

        Ok(out.into_bytes())
    }
}

fn write_toc(out: &mut String, nodes: &[TocNode]) {
    if nodes.is_empty() {
        return;
    }
    out.push_str("<ul>\n");
    for node in nodes {
        let _ = write!(
            out,
            "<li><a href=\"#{}\">{}</a>",
            escape(&node.entry.anchor),
            escape(&node.entry.text)
        );
        write_toc(out, &node.children);
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
}

fn write_page(out: &mut String, doc: &Document, page: &PageContent, idx: usize, opts: &RenderOptions) {
    let _ = writeln!(out, "<section class=\"page\" id=\"{}\">", page_anchor(idx));
    let _ = writeln!(out, "<h1 class=\"page-title\">{}</h1>", escape(&page.title));
    if opts.source_links {
        let url = escape(&page.url);
        let _ = writeln!(out, "<p class=\"source\">Source: <a href=\"{url}\">{url}</a></p>");
    }

    let mut anchors = heading_anchors(page, idx).into_iter();
    let mut lists = ListStack::default();

    for block in &page.blocks {
        let item_level = match block {
            Block::ListItem { level, .. } => usize::from((*level).max(1)),
            _ => 0,
        };
        lists.set_depth(out, item_level);

        match block {
            Block::Heading { level, text } => {
                // Page titles own h1; content headings start one level lower.
                let tag = (level.saturating_add(1)).clamp(2, 6);
                let anchor = anchors.next().unwrap_or_default();
                let _ = writeln!(out, "<h{tag} id=\"{}\">{}</h{tag}>", escape(&anchor), escape(text));
            }
            Block::Paragraph { text } => {
                let _ = writeln!(out, "<p>{}</p>", escape(text));
            }
            Block::Code { language, text } => {
                match language {
                    Some(lang) => {
                        let _ = write!(out, "<pre><code class=\"language-{}\">", escape(lang));
                    }
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape(text));
                out.push_str("</code></pre>\n");
            }
            Block::ListItem { text, .. } => lists.item(out, &escape(text)),
            Block::Image(image) => {
                let src = match doc.asset(image).filter(|_| opts.embed_images) {
                    Some(asset) => format!("data:{};base64,{}", asset.mime_type, BASE64.encode(&asset.bytes)),
                    None => escape(&image.src),
                };
                let alt = escape(&image.alt);
                let _ = write!(out, "<figure><img src=\"{src}\" alt=\"{alt}\">");
                if !image.alt.is_empty() {
                    let _ = write!(out, "<figcaption>{alt}</figcaption>");
                }
                out.push_str("</figure>\n");
            }
            Block::Link { text, url } => {
                let _ = writeln!(out, "<p class=\"link\"><a href=\"{}\">{}</a></p>", escape(url), escape(text));
            }
        }
    }

    lists.set_depth(out, 0);
    out.push_str("</section>\n");
}

/// Open `<ul>` levels; each entry records whether its last `<li>` is still open.
/// Nested lists go inside that open `<li>`.
#[derive(Default)]
struct ListStack(Vec<bool>);

impl ListStack {
    fn set_depth(&mut self, out: &mut String, depth: usize) {
        while self.0.len() > depth {
            if self.0.pop() == Some(true) {
                out.push_str("</li>\n");
            }
            out.push_str("</ul>\n");
        }
        while self.0.len() < depth {
            if let Some(li_open) = self.0.last_mut() {
                if !*li_open {
                    out.push_str("<li>");
                    *li_open = true;
                }
            }
            out.push_str("<ul>\n");
            self.0.push(false);
        }
    }

    fn item(&mut self, out: &mut String, html: &str) {
        let Some(li_open) = self.0.last_mut() else {
            return;
        };
        if *li_open {
            out.push_str("</li>\n");
        }
        let _ = write!(out, "<li>{html}");
        *li_open = true;
    }
}

/// Escape text for HTML element content and attribute values.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

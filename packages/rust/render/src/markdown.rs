//! Markdown renderer.
//!
//! Markdown cannot carry image bytes, so images reference their source URL.
//! Headings get explicit `<a id>` anchors so TOC links do not depend on the
//! viewer's own slug rules.

use std::fmt::Write as _;

use webdoc_shared::{Block, Document, OutputFormat, PageContent, Result, TocEntry, heading_anchors, page_anchor};

use crate::{RenderOptions, Renderer};

/// Renders a single Markdown file.
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }

    fn render(&self, doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Result<Vec<u8>> {
        let mut out = String::with_capacity(8 * 1024);

        let _ = writeln!(out, "# {}\n", inline(&doc.title));
        let _ = writeln!(
            out,
            "_Generated from <{}> on {}_\n",
            doc.source_url,
            doc.generated_at.format("%Y-%m-%d %H:%M UTC")
        );

        if let Some(entries) = toc.filter(|e| !e.is_empty()) {
            write_toc(&mut out, entries);
        }

        for (idx, page) in doc.pages.iter().enumerate() {
            out.push_str("---\n\n");
            write_page(&mut out, page, idx, opts);
        }

        Ok(out.into_bytes())
    }
}

fn write_toc(out: &mut String, entries: &[TocEntry]) {
    out.push_str("## Table of contents\n\n");
    let top = entries.iter().map(|e| e.level).min().unwrap_or(1);
    for entry in entries {
        let indent = "  ".repeat(usize::from(entry.level.saturating_sub(top)));
        let _ = writeln!(out, "{indent}- [{}](#{})", inline(&entry.text), entry.anchor);
    }
    out.push('\n');
}

fn write_page(out: &mut String, page: &PageContent, idx: usize, opts: &RenderOptions) {
    let _ = writeln!(out, "<a id=\"{}\"></a>\n", page_anchor(idx));
    let _ = writeln!(out, "## {}\n", inline(&page.title));
    if opts.source_links {
        let _ = writeln!(out, "Source: <{}>\n", page.url);
    }

    let mut anchors = heading_anchors(page, idx).into_iter();
    let mut in_list = false;

    for block in &page.blocks {
        let is_item = matches!(block, Block::ListItem { .. });
        if in_list && !is_item {
            out.push('\n');
        }
        in_list = is_item;

        match block {
            Block::Heading { level, text } => {
                let hashes = "#".repeat(usize::from(level.saturating_add(2).clamp(3, 6)));
                let anchor = anchors.next().unwrap_or_default();
                let _ = writeln!(out, "<a id=\"{anchor}\"></a>\n{hashes} {}\n", inline(text));
            }
            Block::Paragraph { text } => {
                let _ = writeln!(out, "{}\n", paragraph(text));
            }
            Block::Code { language, text } => {
                let fence = fence_for(text);
                let _ = writeln!(out, "{fence}{}\n{text}\n{fence}\n", language.as_deref().unwrap_or(""));
            }
            Block::ListItem { level, text } => {
                let indent = "  ".repeat(usize::from(level.saturating_sub(1)));
                let _ = writeln!(out, "{indent}- {}", line_start(inline(text)));
            }
            Block::Image(image) => {
                let _ = writeln!(out, "![{}]({})\n", inline(&image.alt), image.src);
            }
            Block::Link { text, url } => {
                let _ = writeln!(out, "[{}]({url})\n", inline(text));
            }
        }
    }
    if in_list {
        out.push('\n');
    }
}

/// A backtick fence longer than any backtick run inside `code`.
fn fence_for(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-line text with Markdown and HTML syntax escaped.
fn inline(text: &str) -> String {
    escape(&one_line(text))
}

/// Paragraph text, escaped line by line so no line opens a block construct.
fn paragraph(text: &str) -> String {
    text.lines()
        .map(|line| line_start(escape(line.trim())))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\\' | '`' | '*' | '_' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escape a leading heading, list or thematic-break marker.
fn line_start(line: String) -> String {
    if line.starts_with(['#', '-', '+', '=']) {
        return format!("\\{line}");
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && line[digits..].starts_with(['.', ')']) {
        return format!("{}\\{}", &line[..digits], &line[digits..]);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_document, sample_toc};

    fn render_md(toc: bool) -> String {
        let doc = sample_document();
        let entries = sample_toc(&doc);
        let bytes = MarkdownRenderer
            .render(&doc, toc.then_some(entries.as_slice()), &RenderOptions::default())
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn sections_per_page_with_source() {
        let md = render_md(false);
        assert!(md.starts_with("# Example &lt;Guide&gt;\n"));
        assert!(md.contains("## Guide\n\nSource: <https://docs.example.com/guide/>"));
        assert!(md.find("## Guide").unwrap() < md.find("## API").unwrap());
        assert!(!md.contains("Table of contents"));
    }

    #[test]
    fn block_variants() {
        let md = render_md(false);
        assert!(md.contains("<a id=\"p1-intro\"></a>\n### Intro"));
        assert!(md.contains("#### Setup"));
        assert!(md.contains("```bash\nnpm install\nnpm test\n```"));
        assert!(md.contains("- First\n  - Nested\n\n"));
        assert!(md.contains("![Architecture](https://docs.example.com/img/arch.png)"));
        assert!(md.contains("[API reference](https://docs.example.com/guide/api)"));
    }

    #[test]
    fn toc_indents_by_level() {
        let md = render_md(true);
        assert!(md.contains("- [Intro](#p1-intro)\n  - [Setup](#p1-setup)\n- [API](#p2-api)\n"));
    }

    #[test]
    fn text_cannot_become_markup() {
        assert_eq!(paragraph("Use the <div> element"), "Use the &lt;div&gt; element");
        assert_eq!(paragraph("# not a heading"), "\\# not a heading");
        assert_eq!(paragraph("- not a list\n1. nor this"), "\\- not a list\n1\\. nor this");
        assert_eq!(paragraph("> quoted & *starred* snake_case"), "&gt; quoted &amp; \\*starred\\* snake\\_case");
        assert_eq!(inline("[a] `b`"), "\\[a\\] \\`b\\`");
        assert_eq!(paragraph("Version 2.0 is out"), "Version 2.0 is out");
    }

    #[test]
    fn escaped_paragraph_in_rendered_page() {
        let mut doc = sample_document();
        doc.pages[0].blocks.push(Block::Paragraph {
            text: "Use the <div> element".into(),
        });
        doc.pages[0].blocks.push(Block::Paragraph {
            text: "# not a heading".into(),
        });
        let md = String::from_utf8(MarkdownRenderer.render(&doc, None, &RenderOptions::default()).unwrap()).unwrap();
        assert!(md.contains("Use the &lt;div&gt; element\n"));
        assert!(md.contains("\n\\# not a heading\n"));
        assert!(!md.contains("<div>"));
    }

    #[test]
    fn fence_outgrows_backticks_in_code() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("a ```` b"), "`````");
    }
}

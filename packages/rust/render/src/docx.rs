//! Word (DOCX) renderer built on `docx-rs`.
//!
//! The TOC is emitted as a Word TOC field; Word fills in page numbers when the
//! field is updated, so the renderer adds a short note telling the reader how.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, BreakType, Docx, Hyperlink, HyperlinkType, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Pic, Run, RunFonts, SpecialIndentType, Start, Style,
    StyleType, TableOfContents,
};
use webdoc_shared::{Block, Document, OutputFormat, PageContent, Result, TocEntry, WebdocError, heading_anchors, page_anchor};

use crate::{RenderOptions, Renderer};

const BULLETS: usize = 1;
/// English Metric Units per pixel at 96 DPI.
const EMU_PER_PX: u32 = 9525;
/// Widest image allowed: six inches.
const MAX_IMAGE_EMU: u32 = 5_486_400;
const MUTED: &str = "666666";
const LINK: &str = "0B5CAD";

/// Renders a Word document.
pub struct DocxRenderer;

impl Renderer for DocxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn render(&self, doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Result<Vec<u8>> {
        let mut docx = styled();

        docx = docx
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text(doc.title.as_str())).style("Title"))
            .add_paragraph(muted(&format!(
                "Generated from {} on {}",
                doc.source_url,
                doc.generated_at.format("%Y-%m-%d %H:%M UTC")
            )));

        if toc.is_some_and(|e| !e.is_empty()) {
            docx = docx
                .add_table_of_contents(
                    TableOfContents::new()
                        .heading_styles_range(1, 4)
                        .alias("Table of contents"),
                )
                .add_paragraph(muted("To update this table, right-click and select \"Update Field\"."));
        }

        let mut bookmark_id = 0;
        for (idx, page) in doc.pages.iter().enumerate() {
            docx = docx.add_paragraph(page_break());
            for paragraph in page_paragraphs(doc, page, idx, opts, &mut bookmark_id) {
                docx = docx.add_paragraph(paragraph);
            }
        }

        let mut buf = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buf)
            .map_err(|e| WebdocError::render(OutputFormat::Docx, e.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// Empty document with heading styles and bullet numbering registered.
fn styled() -> Docx {
    let mut docx = Docx::new()
        .add_style(Style::new("Title", StyleType::Paragraph).name("Title").size(52).bold())
        .add_style(Style::new("Heading1", StyleType::Paragraph).name("Heading 1").size(36).bold())
        .add_style(Style::new("Heading2", StyleType::Paragraph).name("Heading 2").size(30).bold())
        .add_style(Style::new("Heading3", StyleType::Paragraph).name("Heading 3").size(26).bold())
        .add_style(Style::new("Heading4", StyleType::Paragraph).name("Heading 4").size(24).bold());

    let mut bullets = AbstractNumbering::new(BULLETS);
    for level in 0..6 {
        let indent = 720 * (level as i32 + 1);
        bullets = bullets.add_level(
            Level::new(
                level,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("\u{2022}"),
                LevelJc::new("left"),
            )
            .indent(Some(indent), Some(SpecialIndentType::Hanging(360)), None, None),
        );
    }
    docx = docx
        .add_abstract_numbering(bullets)
        .add_numbering(Numbering::new(BULLETS, BULLETS));
    docx
}

fn page_paragraphs(
    doc: &Document,
    page: &PageContent,
    idx: usize,
    opts: &RenderOptions,
    bookmark_id: &mut usize,
) -> Vec<Paragraph> {
    let mut out = Vec::with_capacity(page.blocks.len() + 2);

    // Page titles take Heading 1; content headings shift down one level.
    let id = next_id(bookmark_id);
    out.push(
        Paragraph::new()
            .add_bookmark_start(id, bookmark_name(&page_anchor(idx)))
            .add_run(Run::new().add_text(page.title.as_str()))
            .add_bookmark_end(id)
            .style("Heading1"),
    );
    if opts.source_links {
        out.push(
            Paragraph::new()
                .add_run(Run::new().add_text("Source: ").color(MUTED).size(18))
                .add_hyperlink(link(&page.url).add_run(Run::new().add_text(page.url.as_str()).color(LINK).size(18))),
        );
    }

    let mut anchors = heading_anchors(page, idx).into_iter();
    for block in &page.blocks {
        match block {
            Block::Heading { level, text } => {
                let style = format!("Heading{}", level.saturating_add(1).clamp(2, 4));
                let run = Run::new().add_text(text.as_str());
                let paragraph = match anchors.next() {
                    Some(anchor) => {
                        let id = next_id(bookmark_id);
                        Paragraph::new()
                            .add_bookmark_start(id, bookmark_name(&anchor))
                            .add_run(run)
                            .add_bookmark_end(id)
                    }
                    None => Paragraph::new().add_run(run),
                };
                out.push(paragraph.style(&style));
            }
            Block::Paragraph { text } => {
                out.push(Paragraph::new().add_run(Run::new().add_text(text.as_str())));
            }
            Block::Code { text, .. } => {
                let mono = || RunFonts::new().ascii("Courier New").hi_ansi("Courier New");
                let mut run = Run::new().fonts(mono()).size(18);
                for (i, line) in text.lines().enumerate() {
                    if i > 0 {
                        run = run.add_break(BreakType::TextWrapping);
                    }
                    run = run.add_text(line);
                }
                out.push(Paragraph::new().add_run(run));
            }
            Block::ListItem { level, text } => {
                let depth = usize::from(level.saturating_sub(1).min(5));
                out.push(
                    Paragraph::new()
                        .add_run(Run::new().add_text(text.as_str()))
                        .numbering(NumberingId::new(BULLETS), IndentLevel::new(depth)),
                );
            }
            Block::Image(image) => {
                match doc.asset(image).filter(|_| opts.embed_images) {
                    Some(asset) => {
                        let (w, h) = image_emu(asset.width, asset.height);
                        let pic = Pic::new(&asset.bytes).size(w, h);
                        out.push(Paragraph::new().add_run(Run::new().add_image(pic)));
                        if !image.alt.is_empty() {
                            out.push(muted(&image.alt));
                        }
                    }
                    None => {
                        out.push(
                            Paragraph::new().add_hyperlink(
                                link(&image.src)
                                    .add_run(Run::new().add_text(format!("[Image: {}]", image.alt)).color(LINK)),
                            ),
                        );
                    }
                }
            }
            Block::Link { text, url } => {
                out.push(
                    Paragraph::new()
                        .add_hyperlink(link(url).add_run(Run::new().add_text(text.as_str()).color(LINK))),
                );
            }
        }
    }
    out
}

fn link(url: &str) -> Hyperlink {
    Hyperlink::new(url, HyperlinkType::External)
}

fn muted(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).italic().color(MUTED).size(18))
}

fn page_break() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
}

fn next_id(counter: &mut usize) -> usize {
    *counter += 1;
    *counter
}

/// Word bookmark names allow letters, digits and underscores only.
fn bookmark_name(anchor: &str) -> String {
    anchor
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Image extent in EMU, scaled down to the maximum width.
fn image_emu(width_px: u32, height_px: u32) -> (u32, u32) {
    let w = width_px.max(1).saturating_mul(EMU_PER_PX);
    let h = height_px.max(1).saturating_mul(EMU_PER_PX);
    if w <= MAX_IMAGE_EMU {
        return (w, h);
    }
    let scaled = (u64::from(h) * u64::from(MAX_IMAGE_EMU) / u64::from(w)) as u32;
    (MAX_IMAGE_EMU, scaled.max(1))
}

//! A4 PDF renderer using the built-in PDF fonts.
//!
//! Rendering runs in two passes. The layout pass places every line and
//! image on content pages and records which page each heading landed on;
//! the front matter (title and TOC) is laid out next, and only then are TOC
//! page numbers known. The emit pass writes the planned pages with
//! `printpdf` and adds one outline bookmark per document page.

use std::collections::HashMap;

use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rgb,
};
use tracing::warn;
use webdoc_shared::{Block, Document, OutputFormat, Result, TocEntry, WebdocError, heading_anchors};

use crate::{RenderOptions, Renderer};

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_W: f32 = PAGE_W - 2.0 * MARGIN;
const TOP: f32 = PAGE_H - MARGIN;
const BOTTOM: f32 = MARGIN;
/// Millimetres per typographic point.
const PT: f32 = 0.3528;
/// Line height as a multiple of the font size.
const LEADING: f32 = 1.35;
/// Resolution images are assumed to have before down-scaling.
const SCREEN_DPI: f32 = 96.0;
const LIST_INDENT: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
    Mono,
}

impl Font {
    /// Average glyph advance as a fraction of the font size.
    fn width_factor(self) -> f32 {
        match self {
            Font::Regular | Font::Italic => 0.5,
            Font::Bold => 0.55,
            Font::Mono => 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shade {
    Text,
    Muted,
    Link,
}

#[derive(Debug, Clone)]
enum Op {
    Text {
        text: String,
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        shade: Shade,
    },
    Image {
        asset: String,
        x: f32,
        y: f32,
        dpi: f32,
    },
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Vertical flow of ops over fixed-size pages.
struct Flow {
    pages: Vec<Vec<Op>>,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: TOP,
        }
    }

    fn page(&self) -> usize {
        self.pages.len() - 1
    }

    fn break_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = TOP;
    }

    /// Start a new page unless `height` still fits on the current one.
    fn reserve(&mut self, height: f32) {
        let empty = self.pages.last().is_none_or(Vec::is_empty);
        if self.y - height < BOTTOM && !empty {
            self.break_page();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn push(&mut self, op: Op) {
        if let Some(page) = self.pages.last_mut() {
            page.push(op);
        }
    }

    fn line(&mut self, text: String, font: Font, size: f32, indent: f32, shade: Shade) {
        let height = size * PT * LEADING;
        self.reserve(height);
        self.y -= height;
        let y = self.y;
        self.push(Op::Text {
            text,
            font,
            size,
            x: MARGIN + indent,
            y,
            shade,
        });
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32, indent: f32, shade: Shade) {
        for line in wrap(&pdf_safe(text), max_chars(font, size, indent)) {
            self.line(line, font, size, indent, shade);
        }
    }

    fn code(&mut self, text: &str) {
        let size = 8.5;
        let width = max_chars(Font::Mono, size, 4.0);
        for raw in pdf_safe(text).lines() {
            for line in hard_wrap(raw, width) {
                self.line(line, Font::Mono, size, 4.0, Shade::Text);
            }
        }
    }
}

/// Planned PDF: ops per page plus the facts the emit pass needs.
struct Plan {
    pages: Vec<Vec<Op>>,
    /// Absolute page index where each document page starts.
    page_starts: Vec<usize>,
    /// One-based printed page number for each TOC anchor.
    toc_numbers: HashMap<String, usize>,
}

fn plan(doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Plan {
    // Content pages.
    let mut content = Flow::new();
    let mut page_starts = Vec::with_capacity(doc.pages.len());
    let mut heading_pages: HashMap<String, usize> = HashMap::new();

    for (idx, page) in doc.pages.iter().enumerate() {
        if idx > 0 {
            content.break_page();
        }
        page_starts.push(content.page());
        content.paragraph(&page.title, Font::Bold, 18.0, 0.0, Shade::Text);
        if opts.source_links {
            content.paragraph(&format!("Source: {}", page.url), Font::Italic, 8.0, 0.0, Shade::Muted);
        }
        content.gap(4.0);

        let mut anchors = heading_anchors(page, idx).into_iter();
        for block in &page.blocks {
            match block {
                Block::Heading { level, text } => {
                    let size = match level {
                        1 => 16.0,
                        2 => 14.0,
                        3 => 12.5,
                        _ => 11.0,
                    };
                    content.gap(2.0);
                    content.reserve(size * PT * LEADING * 2.0);
                    if let Some(anchor) = anchors.next() {
                        heading_pages.insert(anchor, content.page());
                    }
                    content.paragraph(text, Font::Bold, size, 0.0, Shade::Text);
                    content.gap(1.0);
                }
                Block::Paragraph { text } => {
                    content.paragraph(text, Font::Regular, 10.0, 0.0, Shade::Text);
                    content.gap(2.0);
                }
                Block::Code { text, .. } => {
                    content.gap(1.0);
                    content.code(text);
                    content.gap(3.0);
                }
                Block::ListItem { level, text } => {
                    let indent = f32::from(level.saturating_sub(1)) * LIST_INDENT;
                    content.paragraph(&format!("- {text}"), Font::Regular, 10.0, indent, Shade::Text);
                    content.gap(0.8);
                }
                Block::Image(image) => {
                    match doc.asset(image).filter(|_| opts.embed_images) {
                        Some(asset) => {
                            let (dpi, height) = image_scale(asset.width, asset.height);
                            content.reserve(height);
                            content.gap(height);
                            let y = content.y;
                            content.push(Op::Image {
                                asset: asset.id.clone(),
                                x: MARGIN,
                                y,
                                dpi,
                            });
                            if !image.alt.is_empty() {
                                content.paragraph(&image.alt, Font::Italic, 8.0, 0.0, Shade::Muted);
                            }
                        }
                        None => {
                            let label = format!("[Image: {}] ({})", image.alt, image.src);
                            content.paragraph(&label, Font::Italic, 9.0, 0.0, Shade::Muted);
                        }
                    }
                    content.gap(3.0);
                }
                Block::Link { text, url } => {
                    content.paragraph(&format!("{text} ({url})"), Font::Regular, 10.0, 0.0, Shade::Link);
                    content.gap(2.0);
                }
            }
        }
    }

    // Front matter; TOC numbers are filled in once its page count is known.
    let mut front = Flow::new();
    front.paragraph(&doc.title, Font::Bold, 22.0, 0.0, Shade::Text);
    front.gap(2.0);
    let generated = format!(
        "Generated from {} on {}",
        doc.source_url,
        doc.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    front.paragraph(&generated, Font::Italic, 9.0, 0.0, Shade::Muted);

    let mut number_slots: Vec<(usize, f32, String)> = Vec::new();
    if let Some(entries) = toc.filter(|e| !e.is_empty()) {
        front.gap(8.0);
        front.paragraph("Table of contents", Font::Bold, 14.0, 0.0, Shade::Text);
        front.gap(2.0);
        let top = entries.iter().map(|e| e.level).min().unwrap_or(1);
        for entry in entries {
            let indent = f32::from(entry.level.saturating_sub(top)) * LIST_INDENT;
            let chars = max_chars(Font::Regular, 10.0, indent + 15.0);
            let text: String = pdf_safe(&entry.text).chars().take(chars).collect();
            front.line(text, Font::Regular, 10.0, indent, Shade::Text);
            number_slots.push((front.page(), front.y, entry.anchor.clone()));
        }
    }

    let front_pages = front.pages.len();
    let mut toc_numbers = HashMap::new();
    for (page, y, anchor) in number_slots {
        let Some(content_page) = heading_pages.get(&anchor) else {
            continue;
        };
        let number = front_pages + content_page + 1;
        toc_numbers.insert(anchor, number);
        front.pages[page].push(Op::Text {
            text: number.to_string(),
            font: Font::Regular,
            size: 10.0,
            x: MARGIN + CONTENT_W - 10.0,
            y,
            shade: Shade::Text,
        });
    }

    let mut pages = front.pages;
    pages.extend(content.pages);
    Plan {
        pages,
        page_starts: page_starts.into_iter().map(|p| p + front_pages).collect(),
        toc_numbers,
    }
}

/// DPI and height (mm) that fit an image into the content box.
fn image_scale(width_px: u32, height_px: u32) -> (f32, f32) {
    let (w, h) = (width_px.max(1) as f32, height_px.max(1) as f32);
    let max_h = (TOP - BOTTOM) * 0.8;
    let dpi = SCREEN_DPI.max(w * 25.4 / CONTENT_W).max(h * 25.4 / max_h);
    (dpi, h * 25.4 / dpi)
}

fn max_chars(font: Font, size: f32, indent: f32) -> usize {
    let glyph = size * PT * font.width_factor();
    (((CONTENT_W - indent) / glyph) as usize).max(10)
}

/// Greedy word wrap at `width` characters; over-long words are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { 0 } else { current.chars().count() + 1 };
        if needed + word.chars().count() > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word.chars().count() > width {
            let mut pieces = hard_wrap(word, width);
            if let Some(last) = pieces.pop() {
                lines.extend(pieces);
                current = last;
            }
            continue;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Split a line every `width` characters, keeping whitespace.
fn hard_wrap(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let chars: Vec<char> = line.chars().collect();
    chars.chunks(width.max(1)).map(|c| c.iter().collect()).collect()
}

/// Map text onto what the built-in (WinAnsi) fonts can show.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2022}' => '-',
            '\u{00a0}' => ' ',
            '\t' => ' ',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Emit
// ---------------------------------------------------------------------------

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn get(&self, font: Font) -> &IndirectFontRef {
        match font {
            Font::Regular => &self.regular,
            Font::Bold => &self.bold,
            Font::Italic => &self.italic,
            Font::Mono => &self.mono,
        }
    }
}

fn render_error(err: impl std::fmt::Display) -> WebdocError {
    WebdocError::render(OutputFormat::Pdf, err.to_string())
}

/// Renders an A4 PDF.
pub struct PdfRenderer;

impl Renderer for PdfRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Result<Vec<u8>> {
        let plan = plan(doc, toc, opts);

        let (pdf, first_page, first_layer) = PdfDocument::new(doc.title.as_str(), Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts {
            regular: pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(render_error)?,
            bold: pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(render_error)?,
            italic: pdf.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(render_error)?,
            mono: pdf.add_builtin_font(BuiltinFont::Courier).map_err(render_error)?,
        };

        let mut images: HashMap<&str, Option<DynamicImage>> = HashMap::new();
        let mut page_refs = Vec::with_capacity(plan.pages.len());

        for (idx, ops) in plan.pages.iter().enumerate() {
            let (page, layer) = if idx == 0 {
                (first_page, first_layer)
            } else {
                pdf.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Layer {}", idx + 1))
            };
            page_refs.push(page);
            let layer = pdf.get_page(page).get_layer(layer);

            for op in ops {
                match op {
                    Op::Text {
                        text,
                        font,
                        size,
                        x,
                        y,
                        shade,
                    } => {
                        layer.set_fill_color(color(*shade));
                        layer.use_text(text.as_str(), *size, Mm(*x), Mm(*y), fonts.get(*font));
                    }
                    Op::Image { asset, x, y, dpi } => {
                        let decoded = images
                            .entry(asset.as_str())
                            .or_insert_with(|| decode_asset(doc, asset));
                        if let Some(img) = decoded {
                            draw_image(&layer, img, *x, *y, *dpi);
                        }
                    }
                }
            }
        }

        for (page, start) in doc.pages.iter().zip(&plan.page_starts) {
            if let Some(page_ref) = page_refs.get(*start) {
                pdf.add_bookmark(pdf_safe(&page.title), *page_ref);
            }
        }

        pdf.save_to_bytes().map_err(render_error)
    }
}

fn color(shade: Shade) -> Color {
    let (r, g, b) = match shade {
        Shade::Text => (0.1, 0.1, 0.1),
        Shade::Muted => (0.45, 0.45, 0.45),
        Shade::Link => (0.04, 0.36, 0.68),
    };
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn decode_asset(doc: &Document, id: &str) -> Option<DynamicImage> {
    let asset = doc.assets.get(id)?;
    match image_crate::load_from_memory(&asset.bytes) {
        // Flatten alpha; built-in image embedding expects opaque RGB.
        Ok(img) => Some(DynamicImage::ImageRgb8(img.to_rgb8())),
        Err(e) => {
            warn!(asset = %id, source = %asset.source_url, error = %e, "cannot embed image in PDF");
            None
        }
    }
}

fn draw_image(layer: &PdfLayerReference, img: &DynamicImage, x: f32, y: f32, dpi: f32) {
    Image::from_dynamic_image(img).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            dpi: Some(dpi),
            ..Default::default()
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_document, sample_toc};

    #[test]
    fn renders_pdf_bytes() {
        let doc = sample_document();
        let toc = sample_toc(&doc);
        let bytes = PdfRenderer.render(&doc, Some(&toc), &RenderOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pages_break_between_documents_pages() {
        let doc = sample_document();
        let plan = plan(&doc, None, &RenderOptions::default());
        // Front page, then one page per document page.
        assert_eq!(plan.pages.len(), 3);
        assert_eq!(plan.page_starts, vec![1, 2]);
        assert!(plan.pages[2].iter().any(|op| matches!(op, Op::Text { text, .. } if text == "Calls.")));
    }

    #[test]
    fn toc_page_numbers_account_for_front_matter() {
        let doc = sample_document();
        let toc = sample_toc(&doc);
        let plan = plan(&doc, Some(&toc), &RenderOptions::default());
        assert_eq!(plan.toc_numbers["p1-intro"], 2);
        assert_eq!(plan.toc_numbers["p1-setup"], 2);
        assert_eq!(plan.toc_numbers["p2-api"], 3);
    }

    #[test]
    fn image_op_planned_for_resolved_asset() {
        let doc = sample_document();
        let embedded = plan(&doc, None, &RenderOptions::default());
        assert!(embedded.pages[1].iter().any(|op| matches!(op, Op::Image { asset, .. } if asset == "abc123")));

        let no_images = RenderOptions {
            embed_images: false,
            ..Default::default()
        };
        let linked = plan(&doc, None, &no_images);
        assert!(!linked.pages.iter().flatten().any(|op| matches!(op, Op::Image { .. })));
        assert!(linked.pages[1].iter().any(
            |op| matches!(op, Op::Text { text, .. } if text.starts_with("[Image: Architecture]"))
        ));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        let lines = wrap("abcdefghijklmnopqrstuvwxyz end", 10);
        assert_eq!(lines, vec!["abcdefghij", "klmnopqrst", "uvwxyz end"]);
    }

    #[test]
    fn long_pages_flow_onto_new_pages() {
        let mut doc = sample_document();
        doc.pages[1].blocks = (0..200)
            .map(|i| Block::Paragraph {
                text: format!("Paragraph {i}"),
            })
            .collect();
        let plan = plan(&doc, None, &RenderOptions::default());
        assert!(plan.pages.len() > 3);
    }

    #[test]
    fn pdf_safe_replaces_unsupported() {
        assert_eq!(pdf_safe("“quoted” – ok"), "\"quoted\" - ok");
        assert_eq!(pdf_safe("日本"), "??");
        assert_eq!(pdf_safe("café"), "café");
    }
}

//! Renderers turning a [`Document`] into a single output artifact.
//!
//! Every renderer is a pure function of the document, the optional TOC and
//! [`RenderOptions`]; writing the bytes to disk is the caller's job. PDF and
//! DOCX sit behind the default-on `pdf` and `docx` features. Asking for a
//! format that was compiled out is a [`WebdocError::Render`] naming it.

mod html;
mod json;
mod markdown;
#[cfg(feature = "docx")]
mod docx;
#[cfg(feature = "pdf")]
mod pdf;

use tracing::{info, instrument};
use webdoc_shared::{Document, OutputFormat, Result, TocEntry, WebdocError};

pub use html::HtmlRenderer;
pub use json::{JsonPage, JsonRenderer, parse_json};
pub use markdown::MarkdownRenderer;
#[cfg(feature = "docx")]
pub use docx::DocxRenderer;
#[cfg(feature = "pdf")]
pub use pdf::PdfRenderer;

/// Knobs shared by all renderers.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Embed resolved image bytes where the format allows it.
    pub embed_images: bool,
    /// Print a `Source:` line under each page title.
    pub source_links: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            embed_images: true,
            source_links: true,
        }
    }
}

/// Produces one artifact format from a document.
pub trait Renderer: Send + Sync {
    /// The format this renderer produces.
    fn format(&self) -> OutputFormat;

    /// Render `doc`, with a table of contents when `toc` is given.
    fn render(&self, doc: &Document, toc: Option<&[TocEntry]>, opts: &RenderOptions) -> Result<Vec<u8>>;
}

/// The renderer for `format`, or a render error if it was compiled out.
pub fn renderer_for(format: OutputFormat) -> Result<Box<dyn Renderer>> {
    match format {
        OutputFormat::Html => Ok(Box::new(HtmlRenderer)),
        OutputFormat::Markdown => Ok(Box::new(MarkdownRenderer)),
        OutputFormat::Json => Ok(Box::new(JsonRenderer)),
        #[cfg(feature = "pdf")]
        OutputFormat::Pdf => Ok(Box::new(PdfRenderer)),
        #[cfg(not(feature = "pdf"))]
        OutputFormat::Pdf => Err(missing_feature(format, "pdf")),
        #[cfg(feature = "docx")]
        OutputFormat::Docx => Ok(Box::new(DocxRenderer)),
        #[cfg(not(feature = "docx"))]
        OutputFormat::Docx => Err(missing_feature(format, "docx")),
    }
}

#[cfg(any(not(feature = "pdf"), not(feature = "docx")))]
fn missing_feature(format: OutputFormat, feature: &str) -> WebdocError {
    WebdocError::render(
        format,
        format!("support for this format is not compiled in; rebuild with the `{feature}` feature"),
    )
}

/// Render `doc` in `format`.
#[instrument(skip_all, fields(format = %format, pages = doc.len()))]
pub fn render(
    format: OutputFormat,
    doc: &Document,
    toc: Option<&[TocEntry]>,
    opts: &RenderOptions,
) -> Result<Vec<u8>> {
    if doc.is_empty() {
        return Err(WebdocError::validation("document has no pages"));
    }
    let renderer = renderer_for(format)?;
    let bytes = renderer.render(doc, toc, opts)?;
    info!(bytes = bytes.len(), toc_entries = toc.map_or(0, <[TocEntry]>::len), "document rendered");
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{TimeZone, Utc};
    use webdoc_shared::{Block, DocumentBuilder, ImageAsset, ImageRef, PageContent, TocEntry, heading_anchors};

    /// 1x1 transparent PNG.
    pub const PIXEL_PNG: &[u8] = &[
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x60,
        0x00, 0x02, 0x00, 0x00, 0x05, 0x00, 0x01, 0x7a, 0x5e, 0xab, 0x3f, 0x00, 0x00, 0x00, 0x00,
        0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    /// Two pages covering every block variant.
    pub fn sample_document() -> webdoc_shared::Document {
        let mut builder = DocumentBuilder::new("https://docs.example.com/guide/").title("Example <Guide>");
        builder.add_asset(ImageAsset {
            id: "abc123".into(),
            source_url: "https://docs.example.com/img/arch.png".into(),
            bytes: PIXEL_PNG.to_vec(),
            mime_type: "image/png".into(),
            width: 1,
            height: 1,
        });
        builder.push_page(PageContent {
            url: "https://docs.example.com/guide/".into(),
            title: "Guide".into(),
            depth: 0,
            category: None,
            blocks: vec![
                Block::Heading { level: 1, text: "Intro".into() },
                Block::Paragraph { text: "Welcome & hello <world>.".into() },
                Block::Heading { level: 2, text: "Setup".into() },
                Block::Code { language: Some("bash".into()), text: "npm install\nnpm test".into() },
                Block::ListItem { level: 1, text: "First".into() },
                Block::ListItem { level: 2, text: "Nested".into() },
                Block::Image(ImageRef {
                    src: "https://docs.example.com/img/arch.png".into(),
                    alt: "Architecture".into(),
                    asset: Some("abc123".into()),
                }),
                Block::Link { text: "API reference".into(), url: "https://docs.example.com/guide/api".into() },
            ],
            links: vec![],
        });
        builder.push_page(PageContent {
            url: "https://docs.example.com/guide/api".into(),
            title: "API".into(),
            depth: 1,
            category: Some("reference".into()),
            blocks: vec![
                Block::Heading { level: 1, text: "API".into() },
                Block::Paragraph { text: "Calls.".into() },
            ],
            links: vec![],
        });
        let mut doc = builder.build();
        doc.generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        doc
    }

    /// Flat TOC over every heading of `doc`.
    pub fn sample_toc(doc: &webdoc_shared::Document) -> Vec<TocEntry> {
        let mut entries = Vec::new();
        for (idx, page) in doc.pages.iter().enumerate() {
            let anchors = heading_anchors(page, idx);
            let headings = page.blocks.iter().filter_map(|b| match b {
                Block::Heading { level, text } => Some((*level, text.clone())),
                _ => None,
            });
            for ((level, text), anchor) in headings.zip(anchors) {
                entries.push(TocEntry {
                    text,
                    level,
                    page_url: page.url.clone(),
                    page_index: idx,
                    anchor,
                });
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_for_each_format() {
        for format in OutputFormat::ALL {
            let renderer = renderer_for(format).unwrap();
            assert_eq!(renderer.format(), format);
        }
    }

    #[test]
    fn empty_document_is_rejected() {
        let doc = webdoc_shared::DocumentBuilder::new("https://a.test/").build();
        let err = render(OutputFormat::Html, &doc, None, &RenderOptions::default()).unwrap_err();
        assert!(matches!(err, WebdocError::Validation { .. }));
    }

    #[test]
    fn render_dispatches_to_format() {
        let doc = testing::sample_document();
        let bytes = render(OutputFormat::Markdown, &doc, None, &RenderOptions::default()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().starts_with("# Example &lt;Guide&gt;"));
    }
}

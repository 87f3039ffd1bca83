//! JSON renderer: one object per page, blocks as tagged variants.
//!
//! Image blocks carry `src`, `alt` and `asset` id as metadata only; bytes are
//! never serialized. The TOC is not part of the JSON output.

use serde::{Deserialize, Serialize};
use webdoc_shared::{Block, Document, OutputFormat, Result, TocEntry, WebdocError};

use crate::{RenderOptions, Renderer};

/// One page as it appears in the JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPage {
    pub url: String,
    pub title: String,
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Plain text of all blocks, one block per line.
    pub text: String,
    pub blocks: Vec<Block>,
}

/// Renders the document as a pretty-printed JSON array.
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, doc: &Document, _toc: Option<&[TocEntry]>, _opts: &RenderOptions) -> Result<Vec<u8>> {
        let pages: Vec<JsonPage> = doc
            .pages
            .iter()
            .map(|page| JsonPage {
                url: page.url.clone(),
                title: page.title.clone(),
                depth: page.depth,
                category: page.category.clone(),
                text: page.text(),
                blocks: page.blocks.clone(),
            })
            .collect();

        let mut bytes = serde_json::to_vec_pretty(&pages)
            .map_err(|e| WebdocError::render(OutputFormat::Json, e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// Parse JSON produced by [`JsonRenderer`] back into pages.
pub fn parse_json(bytes: &[u8]) -> Result<Vec<JsonPage>> {
    serde_json::from_slice(bytes).map_err(|e| WebdocError::parse(format!("invalid webdoc JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_document;

    #[test]
    fn parse_back_preserves_pages_and_blocks() {
        let doc = sample_document();
        let bytes = JsonRenderer.render(&doc, None, &RenderOptions::default()).unwrap();
        let pages = parse_json(&bytes).unwrap();

        assert_eq!(pages.len(), doc.len());
        for (parsed, original) in pages.iter().zip(&doc.pages) {
            assert_eq!(parsed.url, original.url);
            assert_eq!(parsed.blocks.len(), original.blocks.len());
            assert_eq!(parsed.blocks, original.blocks);
            assert_eq!(parsed.text, original.text());
        }
    }

    #[test]
    fn image_blocks_are_metadata() {
        let doc = sample_document();
        let bytes = JsonRenderer.render(&doc, None, &RenderOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        let image = &value[0]["blocks"][6];
        assert_eq!(image["type"], "image");
        assert_eq!(image["src"], "https://docs.example.com/img/arch.png");
        assert_eq!(image["alt"], "Architecture");
        assert_eq!(image["asset"], "abc123");
        assert!(image.get("bytes").is_none());
        assert_eq!(value[1]["category"], "reference");
        assert!(value[0].get("category").is_none());
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(parse_json(b"{not json"), Err(WebdocError::Parse { .. })));
    }
}

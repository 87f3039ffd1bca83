//! Core domain types: crawl tasks, content blocks, pages, images, TOC entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WebdocError;

// ---------------------------------------------------------------------------
// OutputFormat
// ---------------------------------------------------------------------------

/// The artifact formats a document can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Html,
    #[serde(rename = "md", alias = "markdown")]
    Markdown,
    Json,
    Docx,
}

impl OutputFormat {
    /// All formats, in the order they are listed in help text.
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Pdf,
        OutputFormat::Html,
        OutputFormat::Markdown,
        OutputFormat::Json,
        OutputFormat::Docx,
    ];

    /// File extension (without the dot) for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = WebdocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            "md" | "markdown" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "docx" => Ok(Self::Docx),
            other => Err(WebdocError::config(format!(
                "unsupported format '{other}': expected one of pdf, html, md, json, docx"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// CrawlTask
// ---------------------------------------------------------------------------

/// A URL accepted into the frontier, waiting to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Normalized URL to fetch.
    pub url: Url,
    /// Link distance from the seed (seed and sitemap candidates are 0).
    pub depth: u32,
    /// Page on which the link was discovered.
    pub referrer: Option<Url>,
}

impl CrawlTask {
    /// A root task (seed or sitemap candidate).
    pub fn root(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            referrer: None,
        }
    }

    /// A task for a link found on `referrer`, one level deeper.
    pub fn child(url: Url, parent: &CrawlTask) -> Self {
        Self {
            url,
            depth: parent.depth + 1,
            referrer: Some(parent.url.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// A reference from an image block to its source and (once resolved) asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Absolute image URL.
    pub src: String,
    /// Alternative text from the `alt` attribute.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alt: String,
    /// Id of the resolved [`ImageAsset`], set by the image resolver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
}

/// One structural content unit extracted from a page.
///
/// Closed set: every renderer matches it exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },
    ListItem {
        level: u8,
        text: String,
    },
    Image(ImageRef),
    Link {
        text: String,
        url: String,
    },
}

impl Block {
    /// The human-readable text carried by this block.
    pub fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. }
            | Block::Paragraph { text }
            | Block::Code { text, .. }
            | Block::ListItem { text, .. }
            | Block::Link { text, .. } => text,
            Block::Image(image) => &image.alt,
        }
    }

    /// Short tag name, used in logs and degraded renderings.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Code { .. } => "code",
            Block::ListItem { .. } => "list_item",
            Block::Image(_) => "image",
            Block::Link { .. } => "link",
        }
    }
}

// ---------------------------------------------------------------------------
// PageContent
// ---------------------------------------------------------------------------

/// Extracted content of one fetched, in-scope, filter-passing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Normalized page URL.
    pub url: String,
    /// Page title (title element, first heading, or last path segment).
    pub title: String,
    /// Discovery depth from the seed.
    pub depth: u32,
    /// Category label (breadcrumb / active nav), when the page exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Content blocks in document order.
    pub blocks: Vec<Block>,
    /// Absolute, fragment-free out-links in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

impl PageContent {
    /// Concatenated text of all blocks, one block per line.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate over the image references of this page.
    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(image) => Some(image),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// ImageAsset
// ---------------------------------------------------------------------------

/// A fetched, normalized image ready for embedding.
///
/// Lives for a single run only.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Content hash (hex SHA-256 prefix) identifying the asset.
    pub id: String,
    /// URL the image was fetched from.
    pub source_url: String,
    /// Encoded image bytes (PNG or JPEG).
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("id", &self.id)
            .field("source_url", &self.source_url)
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TocEntry
// ---------------------------------------------------------------------------

/// A single table-of-contents entry derived from a heading block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading text.
    pub text: String,
    /// Heading level (1–6).
    pub level: u8,
    /// URL of the page holding the heading.
    pub page_url: String,
    /// Zero-based index of that page in the document.
    pub page_index: usize,
    /// Document-unique anchor of the heading.
    pub anchor: String,
}

/// Nested view over a flat TOC: each node owns the entries of deeper level
/// that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    pub entry: TocEntry,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Nest `entries` by heading level, keeping their order.
    ///
    /// An entry becomes a child of the closest preceding entry with a
    /// smaller level; entries with no such predecessor are roots.
    pub fn tree(entries: &[TocEntry]) -> Vec<TocNode> {
        let mut roots: Vec<TocNode> = Vec::new();
        // Path of indices from the roots down to the most recent node.
        let mut path: Vec<usize> = Vec::new();
        let mut levels: Vec<u8> = Vec::new();

        for entry in entries {
            while levels.last().is_some_and(|&level| level >= entry.level) {
                levels.pop();
                path.pop();
            }

            let node = TocNode {
                entry: entry.clone(),
                children: Vec::new(),
            };
            let siblings = Self::children_at(&mut roots, &path);
            siblings.push(node);
            path.push(siblings.len() - 1);
            levels.push(entry.level);
        }
        roots
    }

    fn children_at<'a>(roots: &'a mut Vec<TocNode>, path: &[usize]) -> &'a mut Vec<TocNode> {
        let mut current = roots;
        for &idx in path {
            current = &mut current[idx].children;
        }
        current
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TocNode::count).sum::<usize>()
    }
}

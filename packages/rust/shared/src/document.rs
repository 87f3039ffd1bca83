//! The canonical document model consumed by every renderer.
//!
//! [`DocumentBuilder`] accumulates pages in completion order and image
//! assets by id. It refuses a second page with an already-present URL, so a
//! built [`Document`] never holds two pages with the same normalized URL.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::types::{Block, ImageAsset, ImageRef, PageContent};

/// The assembled offline document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Seed URL the document was built from.
    pub source_url: String,
    /// Document title.
    pub title: String,
    /// When the document was assembled.
    pub generated_at: DateTime<Utc>,
    /// Pages in completion order.
    pub pages: Vec<PageContent>,
    /// Image assets keyed by content id.
    pub assets: BTreeMap<String, ImageAsset>,
}

impl Document {
    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the document holds no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Total number of blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// Look up the resolved asset of an image block, if any.
    pub fn asset(&self, image: &ImageRef) -> Option<&ImageAsset> {
        image.asset.as_deref().and_then(|id| self.assets.get(id))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates pages and assets into a [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder {
    source_url: String,
    title: Option<String>,
    pages: Vec<PageContent>,
    seen: HashSet<String>,
    assets: BTreeMap<String, ImageAsset>,
}

impl DocumentBuilder {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            title: None,
            pages: Vec::new(),
            seen: HashSet::new(),
            assets: BTreeMap::new(),
        }
    }

    /// Override the document title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a page. Returns `false` (and drops the page) when a page with
    /// the same URL is already present.
    pub fn push_page(&mut self, page: PageContent) -> bool {
        if !self.seen.insert(page.url.clone()) {
            tracing::warn!(url = %page.url, "duplicate page rejected by document builder");
            return false;
        }
        self.pages.push(page);
        true
    }

    /// Register an image asset. Identical content shares one entry.
    pub fn add_asset(&mut self, asset: ImageAsset) {
        self.assets.entry(asset.id.clone()).or_insert(asset);
    }

    /// Whether a page with this URL was already accepted.
    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Number of pages accepted so far.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn build(self) -> Document {
        let title = self
            .title
            .unwrap_or_else(|| format!("Documentation: {}", self.source_url));
        Document {
            source_url: self.source_url,
            title,
            generated_at: Utc::now(),
            pages: self.pages,
            assets: self.assets,
        }
    }
}

// ---------------------------------------------------------------------------
// Anchors
// ---------------------------------------------------------------------------

/// Lowercase, dash-separated alphanumerics of `text`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Anchor of the page at zero-based `page_index`.
pub fn page_anchor(page_index: usize) -> String {
    format!("page-{}", page_index + 1)
}

/// Anchors for every heading of `page`, in block order.
///
/// The result has one entry per [`Block::Heading`]; a heading whose text
/// slugifies to nothing uses `section`.
pub fn heading_anchors(page: &PageContent, page_index: usize) -> Vec<String> {
    let mut used: HashMap<String, usize> = HashMap::new();
    page.blocks
        .iter()
        .filter_map(|block| match block {
            Block::Heading { text, .. } => Some(text),
            _ => None,
        })
        .map(|text| {
            let mut slug = slugify(text);
            if slug.is_empty() {
                slug.push_str("section");
            }
            let count = used.entry(slug.clone()).or_insert(0);
            *count += 1;
            let base = format!("p{}-{slug}", page_index + 1);
            if *count == 1 { base } else { format!("{base}-{count}") }
        })
        .collect()
}

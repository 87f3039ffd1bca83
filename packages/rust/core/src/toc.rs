//! TOC (Table of Contents) builder.
//!
//! Walks every page's heading blocks in document order and emits one flat
//! [`TocEntry`] per heading. Renderers that want hierarchy derive a tree with
//! [`webdoc_shared::TocNode::tree`].

use tracing::{debug, instrument};

use webdoc_shared::{Block, Document, TocEntry, heading_anchors};

/// Build the TOC for `doc`.
///
/// Pages and headings keep their document order; anchors come from
/// [`heading_anchors`] so they match what the renderers emit.
#[instrument(skip_all, fields(pages = doc.len()))]
pub fn build_toc(doc: &Document) -> Vec<TocEntry> {
    let mut entries = Vec::new();

    for (page_index, page) in doc.pages.iter().enumerate() {
        let anchors = heading_anchors(page, page_index);
        let headings = page.blocks.iter().filter_map(|block| match block {
            Block::Heading { level, text } => Some((*level, text)),
            _ => None,
        });

        for ((level, text), anchor) in headings.zip(anchors) {
            entries.push(TocEntry {
                text: text.clone(),
                level,
                page_url: page.url.clone(),
                page_index,
                anchor,
            });
        }
    }

    debug!(entries = entries.len(), "TOC built");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use webdoc_shared::{DocumentBuilder, PageContent, TocNode};

    fn page(url: &str, blocks: Vec<Block>) -> PageContent {
        PageContent {
            url: url.into(),
            title: "T".into(),
            depth: 0,
            category: None,
            blocks,
            links: vec![],
        }
    }

    fn heading(level: u8, text: &str) -> Block {
        Block::Heading {
            level,
            text: text.into(),
        }
    }

    fn para(text: &str) -> Block {
        Block::Paragraph { text: text.into() }
    }

    #[test]
    fn nested_headings_on_one_page() {
        let mut builder = DocumentBuilder::new("https://docs.example.com/guide/");
        builder.push_page(page(
            "https://docs.example.com/guide/",
            vec![heading(1, "Intro"), para("x"), heading(2, "Setup")],
        ));
        let toc = build_toc(&builder.build());

        assert_eq!(toc.len(), 2);
        assert_eq!((toc[0].text.as_str(), toc[0].level), ("Intro", 1));
        assert_eq!((toc[1].text.as_str(), toc[1].level), ("Setup", 2));
        assert_eq!(toc[0].page_url, toc[1].page_url);
        assert_eq!(toc[0].page_index, toc[1].page_index);
        assert_ne!(toc[0].anchor, toc[1].anchor);

        let tree = TocNode::tree(&toc);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].entry.text, "Setup");
    }

    #[test]
    fn entries_follow_page_order() {
        let mut builder = DocumentBuilder::new("https://a.test/");
        builder.push_page(page("https://a.test/b", vec![heading(2, "Beta")]));
        builder.push_page(page("https://a.test/none", vec![para("no headings")]));
        builder.push_page(page("https://a.test/a", vec![heading(1, "Alpha"), heading(1, "Alpha")]));
        let toc = build_toc(&builder.build());

        let summary: Vec<(&str, usize, &str)> = toc
            .iter()
            .map(|e| (e.text.as_str(), e.page_index, e.anchor.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("Beta", 0, "p1-beta"), ("Alpha", 2, "p3-alpha"), ("Alpha", 2, "p3-alpha-2")]
        );
    }

    #[test]
    fn empty_document_has_empty_toc() {
        assert!(build_toc(&DocumentBuilder::new("https://a.test/").build()).is_empty());
    }
}

//! Shared types, error model, and configuration for webdoc.
//!
//! This crate is the foundation depended on by all other webdoc crates.
//! It provides:
//! - [`WebdocError`] and [`FetchError`], the unified error types
//! - Domain types ([`Block`], [`PageContent`], [`ImageAsset`], [`TocEntry`], [`CrawlTask`])
//! - The document model ([`Document`], [`DocumentBuilder`]) and heading anchors
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod document;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, DEFAULT_USER_AGENT, DefaultsConfig, FiltersConfig, SitemapMode,
    config_dir, config_file_path, init_config, load_config, load_config_from, seconds, split_list,
};
pub use document::{Document, DocumentBuilder, heading_anchors, page_anchor, slugify};
pub use error::{FetchError, Result, WebdocError};
pub use types::{Block, CrawlTask, ImageAsset, ImageRef, OutputFormat, PageContent, TocEntry, TocNode};

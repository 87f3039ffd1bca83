//! Crawling: fetching, link analysis, scheduling and image resolution.
//!
//! This crate provides:
//! - [`Fetcher`]: delayed, retried HTTP GETs
//! - [`scope`]: URL normalization, crawl scope and page filters
//! - [`ImageResolver`]: image fetch and PNG normalization
//! - [`Crawler`]: the breadth-first scheduler producing a [`Document`](webdoc_shared::Document)

pub mod engine;
pub mod fetcher;
pub mod images;
pub mod scope;

pub use engine::{CrawlProgress, CrawlReport, Crawler, PageStatus, SilentProgress, VisitedSet};
pub use fetcher::{BinaryResponse, Fetcher, HtmlResponse};
pub use images::{ImageResolver, SVG_TARGET_WIDTH};
pub use scope::{CrawlScope, PageFilter, RejectReason, ScopeDecision, normalize};

//! Core pipeline orchestration for webdoc.
//!
//! This crate ties together crawling, TOC derivation, rendering and output
//! writing into one end-to-end workflow ([`pipeline::convert`]).

pub mod output;
pub mod pipeline;
pub mod select;
pub mod toc;

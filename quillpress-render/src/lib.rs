//! # quillpress-render
//!
//! Page rendering for quillpress.
//!
//! This crate turns rendered posts into full HTML documents using Askama.

pub mod pages;
pub mod templates;

pub use pages::{post_data_json, PageRenderer, RenderError};
pub use templates::{IndexEntry, IndexTemplate, PostTemplate, RelatedEntry, TagCount, TagLink};

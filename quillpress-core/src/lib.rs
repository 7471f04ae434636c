//! # quillpress-core
//!
//! Core library for the quillpress blog generator.
//!
//! This crate loads the post corpus, turns markdown into page-ready HTML,
//! picks related posts, fans page builds out over a bounded worker pool,
//! writes the RSS feed and searches it.

pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod loader;
pub mod markdown;
pub mod models;
pub mod orchestrator;
pub mod related;
pub mod search;
pub mod slug;
pub mod text;

pub use config::Config;
pub use loader::{load_all, LoadedCorpus};
pub use markdown::MarkdownTransformer;
pub use models::{Heading, Post, PostData, RenderedPost};
pub use orchestrator::{BuildJob, BuildReport, PoolError, WorkerPool};
pub use search::{SearchDocument, SearchEngine};
pub use slug::heading_slug;

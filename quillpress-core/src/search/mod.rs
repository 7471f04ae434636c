//! Feed-backed full-text search.
//!
//! The published feed is the only data source: it is parsed into
//! [`SearchDocument`]s once per session and every query is scored by the
//! single ranking function in [`ranking`].

pub mod engine;
pub mod index;
pub mod ranking;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{
    Debouncer, EngineState, FeedSource, FileFeedSource, HttpFeedSource, SearchEngine,
    SearchResult,
};
pub use index::parse_feed;
pub use ranking::{
    build_excerpt, highlight_title, query_terms, rank, score_document, RankedDocument, Score,
};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Failed to fetch feed: {0}")]
    FeedFetch(String),

    #[error("Feed fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to parse feed: {0}")]
    Parse(#[from] quick_xml::Error),
}

/// One searchable post, as published in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDocument {
    pub id: String,
    pub title: String,
    pub link: String,
    /// Plain text body, image and other tags stripped
    pub content: String,
    pub categories: Vec<String>,
    /// Lowercased title, content and categories
    pub search_text: String,
}

impl SearchDocument {
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        categories: Vec<String>,
    ) -> Self {
        let link = link.into();
        let title = title.into();
        let content = content.into();
        let search_text =
            format!("{} {} {}", title, content, categories.join(" ")).to_lowercase();
        Self {
            id: id_from_link(&link),
            title,
            link,
            content,
            categories,
            search_text,
        }
    }
}

/// Last path segment of a post URL without its `.html` suffix
pub fn id_from_link(link: &str) -> String {
    let path = link.split(['?', '#']).next().unwrap_or(link);
    let segment = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    segment.strip_suffix(".html").unwrap_or(segment).to_string()
}

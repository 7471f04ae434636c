//! Lazy, session-scoped search over the published feed.

use super::index::parse_feed;
use super::ranking::{build_excerpt, highlight_title, query_terms, rank};
use super::{SearchDocument, SearchError};
use crate::config::SearchConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Where the feed document comes from
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<String, SearchError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Feed read from the build output directory
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch(&self) -> Result<String, SearchError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SearchError::FeedFetch(format!("{}: {}", self.path.display(), e)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Feed fetched from a deployed site
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<String, SearchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SearchError::FeedFetch(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| SearchError::FeedFetch(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Loading,
    Scored,
    Rendered,
}

/// One rendered hit: HTML-ready title and excerpt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub link: String,
    pub title_html: String,
    pub excerpt_html: String,
    pub categories: Vec<String>,
    pub score: u32,
}

pub struct SearchEngine<S> {
    source: S,
    fetch_timeout: Duration,
    excerpt_length: usize,
    index: Option<Vec<SearchDocument>>,
    state: EngineState,
}

impl<S: FeedSource> SearchEngine<S> {
    pub fn new(source: S, config: &SearchConfig) -> Self {
        Self {
            source,
            fetch_timeout: config.fetch_timeout(),
            excerpt_length: config.excerpt_length,
            index: None,
            state: EngineState::Idle,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }

    /// Cached index, if it has been loaded
    pub fn documents(&self) -> Option<&[SearchDocument]> {
        self.index.as_deref()
    }

    /// Fetch and parse the feed once; later calls reuse the cached index
    pub async fn load(&mut self) -> Result<&[SearchDocument], SearchError> {
        if self.index.is_none() {
            self.state = EngineState::Loading;
            tracing::debug!("Loading search index from {}", self.source.describe());

            let loaded = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await
            {
                Ok(Ok(xml)) => parse_feed(&xml),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(SearchError::Timeout(self.fetch_timeout)),
            };

            match loaded {
                Ok(documents) => {
                    tracing::info!("Search index ready: {} documents", documents.len());
                    self.index = Some(documents);
                }
                Err(e) => {
                    self.state = EngineState::Idle;
                    return Err(e);
                }
            }
        }
        Ok(self.index.as_deref().unwrap_or_default())
    }

    /// Run one query. A failed index load is logged and yields no results;
    /// the next call retries the load.
    pub async fn search(&mut self, query: &str) -> Vec<SearchResult> {
        if let Err(e) = self.load().await {
            tracing::warn!("Search unavailable: {}", e);
            return Vec::new();
        }
        let Some(documents) = self.index.as_deref() else {
            return Vec::new();
        };

        let ranked = rank(documents, query);
        self.state = EngineState::Scored;

        let terms = query_terms(query);
        let results = ranked
            .into_iter()
            .map(|r| SearchResult {
                id: r.document.id.clone(),
                link: r.document.link.clone(),
                title_html: highlight_title(&r.document.title, query),
                excerpt_html: build_excerpt(&r.document.content, &terms, self.excerpt_length),
                categories: r.document.categories.clone(),
                score: r.score.total,
            })
            .collect();
        self.state = EngineState::Rendered;
        results
    }
}

/// Runs only the last of a burst of calls, `delay` after it was made.
///
/// The CLI answers one query per process and never needs it; this is for
/// embedders driving [`SearchEngine`] from keystrokes, typically built with
/// [`Debouncer::from_config`] so the delay follows `search.debounce_ms`.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.debounce())
    }

    /// Schedule `task`, cancelling whatever was still waiting
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
    }

    /// Wait for the scheduled task, if any, to run
    pub async fn flush(&self) {
        let pending = self.pending.lock().take();
        if let Some(handle) = pending {
            let _ = handle.await;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

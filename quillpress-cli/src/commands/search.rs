//! Search command implementation.

use anyhow::{Context, Result};
use quillpress_core::search::{
    FeedSource, FileFeedSource, HttpFeedSource, SearchEngine, SearchResult,
};
use quillpress_core::text::html_to_text;
use quillpress_core::Config;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub limit: usize,
    pub json: bool,
    /// Feed path or URL; the built feed when unset
    pub feed: Option<String>,
}

/// Search the feed and print ranked results
pub async fn search_feed(config_path: &Path, query: &str, opts: SearchOptions) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    let results = match opts.feed.as_deref() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            run_query(SearchEngine::new(HttpFeedSource::new(url), &config.search), query).await?
        }
        Some(path) => {
            run_query(SearchEngine::new(FileFeedSource::new(path), &config.search), query).await?
        }
        None => {
            let source = FileFeedSource::new(config.feed_path());
            run_query(SearchEngine::new(source, &config.search), query).await?
        }
    };

    let shown = &results[..results.len().min(opts.limit)];

    if opts.json {
        let json = serde_json::to_string_pretty(shown)?;
        println!("{json}");
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for '{}'", query);
        return Ok(());
    }

    println!("\nFound {} results for '{}':\n", results.len(), query);
    for result in shown {
        print_search_result(result);
    }
    if results.len() > opts.limit {
        println!("  ... and {} more results", results.len() - opts.limit);
    }

    Ok(())
}

async fn run_query<S: FeedSource>(
    mut engine: SearchEngine<S>,
    query: &str,
) -> Result<Vec<SearchResult>> {
    // Load explicitly so a missing or broken feed is an error here, not an empty result
    engine.load().await.context("Failed to load search index")?;
    Ok(engine.search(query).await)
}

fn print_search_result(result: &SearchResult) {
    println!("[{}] {}", result.score, html_to_text(&result.title_html));
    println!("  {}", result.link);
    let excerpt = html_to_text(&result.excerpt_html);
    if !excerpt.is_empty() {
        println!("  {}", excerpt);
    }
    println!();
}

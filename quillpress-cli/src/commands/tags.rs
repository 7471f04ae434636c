//! Tags command implementation.

use anyhow::{Context, Result};
use quillpress_core::loader::tag_counts;
use quillpress_core::{load_all, Config};
use std::path::Path;

/// Print every tag with the number of posts carrying it
pub fn list_tags(config_path: &Path) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let corpus = load_all(&config.posts_dir()).context("Failed to load posts")?;

    let counts = tag_counts(&corpus.posts);
    if counts.is_empty() {
        println!("No tags found");
        return Ok(());
    }

    for (tag, count) in counts {
        println!("#{tag} ({count})");
    }
    Ok(())
}

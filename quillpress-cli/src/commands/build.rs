//! Build command implementation.

use anyhow::{bail, Context, Result};
use quillpress_core::orchestrator::RenderJobError;
use quillpress_core::related::{post_rng, related_for};
use quillpress_core::{
    feed, load_all, BuildJob, Config, LoadedCorpus, MarkdownTransformer, Post, WorkerPool,
};
use quillpress_render::PageRenderer;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Build the whole site: post pages, then the index page, then the feed
pub fn build_site(config_path: &Path, jobs: Option<usize>) -> Result<()> {
    tracing::info!("Loading config from {:?}", config_path);
    let mut config = Config::from_file(config_path).context("Failed to load configuration")?;
    if let Some(jobs) = jobs {
        config.build.max_workers = Some(jobs);
    }

    tracing::info!("Building site: {}", config.site.title);

    let corpus = load_all(&config.posts_dir()).context("Failed to load posts")?;
    if !corpus.errors.is_empty() {
        tracing::warn!("Skipped {} documents that failed to parse", corpus.errors.len());
    }

    let pages_dir = config.post_pages_dir();
    prune_post_pages(&pages_dir)?;

    let transformer = MarkdownTransformer::new(config.normalized_base_url())
        .with_excerpt_length(config.search.excerpt_length);
    let renderer = PageRenderer::new(&config);

    let build_jobs: Vec<BuildJob> = corpus
        .posts
        .iter()
        .map(|post| BuildJob::new(&post.id, pages_dir.join(format!("{}.html", post.id))))
        .collect();

    let pool = WorkerPool::from_config(&config.build);
    let report = pool
        .run(&build_jobs, |job| {
            render_post_page(&config, &corpus, &transformer, &renderer, job)
        })
        .context("Failed to run page builds")?;

    // Only pages written by this build are listed and syndicated
    let completed: HashSet<&str> = report.completed.iter().map(String::as_str).collect();
    let published: Vec<Post> = corpus
        .posts
        .iter()
        .filter(|post| completed.contains(post.id.as_str()))
        .cloned()
        .collect();

    let index_html = renderer
        .render_index(&published)
        .context("Failed to render index page")?;
    let index_path = config.output_dir().join("index.html");
    fs::write(&index_path, index_html).context("Failed to write index page")?;

    let stats = feed::write_feed(&config, &published).context("Failed to write feed")?;

    tracing::info!("✓ Built {} pages", report.completed.len());
    tracing::info!("✓ Feed written to {:?} ({} items)", stats.path, stats.items);
    tracing::info!("✓ Output written to {:?}", config.output_dir());

    if !report.is_success() {
        for line in report.failure_summary() {
            eprintln!("{line}");
        }
        bail!(
            "{} of {} posts failed to build",
            report.failures.len(),
            report.attempted()
        );
    }

    Ok(())
}

/// Remove every post page left by earlier builds, so pages of deleted posts
/// and stale pages of failed jobs are never served
fn prune_post_pages(pages_dir: &Path) -> Result<()> {
    fs::create_dir_all(pages_dir).context("Failed to create output directory")?;

    let mut removed = 0;
    for entry in fs::read_dir(pages_dir).context("Failed to read output directory")? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && path.extension().is_some_and(|ext| ext == "html") {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale page {}", path.display()))?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!("Removed {} pages from the previous build", removed);
    }
    Ok(())
}

/// Render one post page and write it to the job's output path
fn render_post_page(
    config: &Config,
    corpus: &LoadedCorpus,
    transformer: &MarkdownTransformer,
    renderer: &PageRenderer,
    job: &BuildJob,
) -> Result<(), RenderJobError> {
    let post = corpus
        .find(&job.post_id)
        .ok_or_else(|| RenderJobError::Render(format!("unknown post {}", job.post_id)))?;

    let rendered = transformer.render(post);
    let mut rng = post_rng(config.related.seed, &post.id);
    let related = related_for(&corpus.posts, post, &config.related, &mut rng);

    let html = renderer
        .render_post(post, &rendered, &related)
        .map_err(|e| RenderJobError::Render(e.to_string()))?;
    fs::write(&job.output_path, html)?;

    tracing::debug!("Wrote {:?}", job.output_path);
    Ok(())
}

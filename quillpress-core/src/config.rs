//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Main configuration struct matching the quillpress.yml schema.
///
/// Built once at startup and handed to every component that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub related: RelatedConfig,

    #[serde(default)]
    pub search: SearchConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    String::from("/")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub description: String,

    pub url: String,

    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    String::from("en-us")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_posts_dir")]
    pub posts: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
}

fn default_posts_dir() -> PathBuf {
    PathBuf::from("posts")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            posts: default_posts_dir(),
            output: default_output_dir(),
        }
    }
}

/// Worker pool sizing and progress reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Workers per available CPU
    #[serde(default = "default_worker_multiplier")]
    pub worker_multiplier: usize,

    /// Hard override for the worker count
    #[serde(default)]
    pub max_workers: Option<usize>,

    /// Log progress every N finished jobs
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_worker_multiplier() -> usize {
    2
}

fn default_progress_interval() -> usize {
    10
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            worker_multiplier: default_worker_multiplier(),
            max_workers: None,
            progress_interval: default_progress_interval(),
        }
    }
}

impl BuildConfig {
    /// Concurrency limit: explicit override, or multiplier x available parallelism.
    pub fn concurrency(&self) -> usize {
        if let Some(max) = self.max_workers {
            return max.max(1);
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.worker_multiplier.saturating_mul(cpus).max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedConfig {
    #[serde(default = "default_related_limit")]
    pub limit: usize,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// How many of the most recent candidates are always shown
    #[serde(default = "default_latest")]
    pub latest: usize,

    /// Fixed seed for the random pick; builds are reproducible when set
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_related_limit() -> usize {
    3
}

fn default_max_candidates() -> usize {
    10
}

fn default_latest() -> usize {
    2
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            limit: default_related_limit(),
            max_candidates: default_max_candidates(),
            latest: default_latest(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_excerpt_length() -> usize {
    160
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            excerpt_length: default_excerpt_length(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Minimal config for a site, with every optional section defaulted
    pub fn new(site: SiteConfig) -> Self {
        Self {
            site,
            paths: PathsConfig::default(),
            base_url: default_base_url(),
            build: BuildConfig::default(),
            related: RelatedConfig::default(),
            search: SearchConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.related.latest > self.related.limit {
            return Err(ConfigError::InvalidValue {
                field: "related.latest".to_string(),
                reason: format!("must not exceed related.limit ({})", self.related.limit),
            });
        }
        if self.build.progress_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "build.progress_interval".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the posts directory, resolved relative to config file
    pub fn posts_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.posts)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Well-known location of the syndication feed
    pub fn feed_path(&self) -> PathBuf {
        self.output_dir().join(FEED_FILENAME)
    }

    /// Directory holding one page per post
    pub fn post_pages_dir(&self) -> PathBuf {
        self.output_dir().join(POSTS_SUBDIR)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_ref().and_then(|p| p.parent()) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Normalized base URL with leading and trailing slash ("/foo/" or "/")
    pub fn normalized_base_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }

    /// Site-relative URL of a post page, e.g. "/posts/hello.html"
    pub fn post_href(&self, id: &str) -> String {
        format!("{}{}/{}.html", self.normalized_base_url(), POSTS_SUBDIR, id)
    }

    /// Absolute URL for a site-relative path
    pub fn absolute_url(&self, rel: &str) -> String {
        absolute_url(&self.site.url, &self.normalized_base_url(), rel)
    }
}

pub const FEED_FILENAME: &str = "rss.xml";
pub const POSTS_SUBDIR: &str = "posts";

/// Ensure base URLs have a leading and trailing slash
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Join a site root, a base url and a relative path into one absolute URL
pub fn absolute_url(site_url: &str, base_url: &str, rel: &str) -> String {
    let root = site_url.trim_end_matches('/');
    let base = base_url.trim_matches('/');
    let rel = rel.trim_start_matches('/');

    let mut url = root.to_string();
    for part in [base, rel] {
        if !part.is_empty() {
            url.push('/');
            url.push_str(part);
        }
    }
    if rel.is_empty() {
        url.push('/');
    }
    url
}

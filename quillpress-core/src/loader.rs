//! Corpus loading: one markdown file per post.

use crate::frontmatter::{parse_date, parse_frontmatter, FrontmatterError};
use crate::markdown::split_title;
use crate::models::Post;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use walkdir::WalkDir;

/// Structural failures that abort a load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Corpus directory not found: {0}")]
    CorpusNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to list corpus directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Per-document failures; recorded, never fatal
#[derive(Error, Debug)]
pub enum DocumentParseError {
    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("No top-level heading or frontmatter title")]
    MissingTitle,

    #[error("File name is not valid UTF-8")]
    InvalidFileName,
}

#[derive(Debug)]
pub struct DocumentError {
    pub path: PathBuf,
    pub error: DocumentParseError,
}

/// Posts in display order plus the documents that failed to parse
#[derive(Debug, Default)]
pub struct LoadedCorpus {
    pub posts: Vec<Post>,
    pub errors: Vec<DocumentError>,
}

impl LoadedCorpus {
    pub fn find(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }
}

static HASHTAG_TOKEN: OnceLock<Regex> = OnceLock::new();

fn hashtag_token() -> &'static Regex {
    HASHTAG_TOKEN.get_or_init(|| Regex::new(r"#([A-Za-z0-9_-]+)").unwrap())
}

/// Tags are the hashtag tokens on the last non-blank line, `#` stripped.
///
/// # Example
///
/// ```
/// use quillpress_core::loader::extract_tags;
///
/// assert_eq!(extract_tags("Body\n\n#a #b-2 #c_3\n"), vec!["a", "b-2", "c_3"]);
/// assert!(extract_tags("Body with #hash\n\nlast line").is_empty());
/// ```
pub fn extract_tags(raw: &str) -> Vec<String> {
    let Some(last_line) = raw.lines().rev().find(|line| !line.trim().is_empty()) else {
        return Vec::new();
    };
    if !last_line.contains('#') {
        return Vec::new();
    }
    hashtag_token()
        .captures_iter(last_line)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Load every `*.md` post directly inside `dir`.
///
/// Sorted by date descending, ties broken by id ascending. A missing
/// directory is fatal; a malformed document is logged and collected.
pub fn load_all(dir: &Path) -> Result<LoadedCorpus, LoadError> {
    if !dir.is_dir() {
        return Err(LoadError::CorpusNotFound(dir.to_path_buf()));
    }

    let files = discover_markdown_files(dir)?;
    tracing::info!("Found {} markdown files in {:?}", files.len(), dir);

    let mut corpus = LoadedCorpus::default();
    for path in files {
        match load_post(&path) {
            Ok(post) => corpus.posts.push(post),
            Err(error) => {
                tracing::warn!("Failed to parse {:?}: {}", path, error);
                corpus.errors.push(DocumentError { path, error });
            }
        }
    }

    sort_posts(&mut corpus.posts);
    Ok(corpus)
}

/// Date descending, then id ascending
pub fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

fn discover_markdown_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|e| e.to_str()) == Some("md")
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Parse a single post file
pub fn load_post(path: &Path) -> Result<Post, DocumentParseError> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or(DocumentParseError::InvalidFileName)?
        .to_string();
    let raw = fs::read_to_string(path)?;
    parse_post(id, path.to_path_buf(), raw)
}

/// Build a post from file contents
pub fn parse_post(id: String, source_path: PathBuf, raw: String) -> Result<Post, DocumentParseError> {
    let (frontmatter, body) = parse_frontmatter(&raw)?;
    let date_raw = frontmatter
        .date
        .as_deref()
        .ok_or_else(|| FrontmatterError::MissingField("date".to_string()))?;
    let date = parse_date(date_raw)?;

    let (heading_title, _) = split_title(&body);
    let title = heading_title
        .or_else(|| frontmatter.title.clone().filter(|t| !t.trim().is_empty()))
        .ok_or(DocumentParseError::MissingTitle)?;

    Ok(Post {
        id,
        title,
        date,
        tags: extract_tags(&raw),
        description: frontmatter.description,
        raw_markdown: raw,
        body_markdown: body,
        source_path,
    })
}

/// Sorted, de-duplicated set of every tag in the corpus
pub fn all_tags(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .flat_map(|p| p.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Tag with the number of posts carrying it, sorted by tag
pub fn tag_counts(posts: &[Post]) -> Vec<(String, usize)> {
    all_tags(posts)
        .into_iter()
        .map(|tag| {
            let count = posts.iter().filter(|p| p.has_tag(&tag)).count();
            (tag, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_extract_tags_last_line() {
        assert_eq!(extract_tags("text\n#a #b-2 #c_3"), vec!["a", "b-2", "c_3"]);
    }

    #[test]
    fn test_extract_tags_ignores_trailing_blank_lines() {
        assert_eq!(extract_tags("text\n#rust\n\n   \n"), vec!["rust"]);
    }

    #[test]
    fn test_extract_tags_no_hash_on_last_line() {
        assert!(extract_tags("#early tag\n\nplain ending").is_empty());
        assert!(extract_tags("").is_empty());
    }

    #[test]
    fn test_extract_tags_preserves_order() {
        assert_eq!(extract_tags("x\n#zeta #alpha #mid"), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_load_all_sorted_with_id_tiebreak() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b.md", "---\ndate: 2024-01-01\n---\n# B\n");
        write(dir.path(), "a.md", "---\ndate: 2024-01-01\n---\n# A\n");
        write(dir.path(), "new.md", "---\ndate: 2024-06-01\n---\n# New\n\n#rust\n");
        write(dir.path(), "notes.txt", "ignored");

        let corpus = load_all(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "a", "b"]);
        assert!(corpus.errors.is_empty());

        let newest = &corpus.posts[0];
        assert_eq!(newest.title, "New");
        assert_eq!(newest.tags, vec!["rust"]);
        assert_eq!(newest.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_bad_documents_are_collected_not_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "good.md", "---\ndate: 2024-01-01\n---\n# Good\n");
        write(dir.path(), "nodate.md", "---\ntitle: x\n---\n# No date\n");
        write(dir.path(), "notitle.md", "---\ndate: 2024-01-01\n---\njust text\n");
        write(dir.path(), "baddate.md", "---\ndate: soon\n---\n# Bad date\n");

        let corpus = load_all(dir.path()).unwrap();
        assert_eq!(corpus.posts.len(), 1);
        assert_eq!(corpus.errors.len(), 3);
        assert!(corpus
            .errors
            .iter()
            .any(|e| matches!(e.error, DocumentParseError::MissingTitle)));
    }

    #[test]
    fn test_frontmatter_title_fallback() {
        let post = parse_post(
            "x".into(),
            PathBuf::from("x.md"),
            "---\ndate: 2024-01-01\ntitle: From YAML\n---\nBody only\n".into(),
        )
        .unwrap();
        assert_eq!(post.title, "From YAML");
    }

    #[test]
    fn test_missing_corpus_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(load_all(&missing), Err(LoadError::CorpusNotFound(_))));
    }

    #[test]
    fn test_all_tags_and_counts() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.md", "---\ndate: 2024-01-01\n---\n# A\n\n#rust #web\n");
        write(dir.path(), "b.md", "---\ndate: 2024-01-02\n---\n# B\n\n#rust\n");
        let corpus = load_all(dir.path()).unwrap();

        assert_eq!(all_tags(&corpus.posts), vec!["rust", "web"]);
        assert_eq!(
            tag_counts(&corpus.posts),
            vec![("rust".to_string(), 2), ("web".to_string(), 1)]
        );
    }
}

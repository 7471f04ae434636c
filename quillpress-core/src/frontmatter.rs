//! Frontmatter parsing from markdown files.

use crate::models::Frontmatter;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Missing frontmatter block")]
    Missing,

    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*(?:\n(.*))?$").unwrap())
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (frontmatter, markdown_body). A post without a
/// frontmatter block is an error since `date` is required.
///
/// # Example
///
/// ```
/// use quillpress_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ndate: 2025-01-01\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.date, Some("2025-01-01".to_string()));
/// assert!(body.trim().starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let normalized = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let captures = frontmatter_regex()
        .captures(&normalized)
        .ok_or(FrontmatterError::Missing)?;

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let frontmatter: Frontmatter = serde_yaml::from_str(yaml)?;
    if frontmatter.date.is_none() {
        return Err(FrontmatterError::MissingField("date".to_string()));
    }

    Ok((frontmatter, body.to_string()))
}

/// Parse a frontmatter date, accepting an optional trailing time component
pub fn parse_date(raw: &str) -> Result<NaiveDate, FrontmatterError> {
    let trimmed = raw.trim();
    let day = trimmed
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| FrontmatterError::InvalidDate(raw.to_string()))
}

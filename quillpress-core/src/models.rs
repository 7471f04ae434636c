//! Content model structs for posts and rendered output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Frontmatter metadata from markdown files
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Frontmatter {
    /// Raw date string; required, validated by the loader
    #[serde(default)]
    pub date: Option<String>,

    /// Fallback title when the body has no top-level heading
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// A single post in the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Unique id derived from the source file stem
    pub id: String,

    /// Display title
    pub title: String,

    /// Publication date
    pub date: NaiveDate,

    /// Hashtags from the last non-blank line, in order, without `#`
    pub tags: Vec<String>,

    /// Frontmatter description, if any
    pub description: Option<String>,

    /// Full file contents as read from disk
    pub raw_markdown: String,

    /// Body after frontmatter removal
    pub body_markdown: String,

    /// Source file the post was loaded from
    pub source_path: PathBuf,
}

impl Post {
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Date as shown on pages, e.g. "March 5, 2024"
    pub fn display_date(&self) -> String {
        format_display_date(&self.date)
    }

    /// Date as YYYY-MM-DD
    pub fn iso_date(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

pub fn format_display_date(date: &NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// A heading found in a post body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u32,
    pub text: String,
    pub id: String,
}

/// Output of the markdown transformer for one post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedPost {
    pub title: String,

    /// Slug of the displayed title, used as the page title anchor
    pub title_id: String,

    /// Body HTML (title heading removed)
    pub content_html: String,

    pub headings: Vec<Heading>,

    /// True when the body has any level 2 or 3 heading
    pub has_table_of_contents: bool,

    /// Plain-text excerpt of the body
    pub excerpt: String,
}

/// JSON object embedded in every post page for client scripts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostData {
    pub title: String,
    pub title_id: String,
    pub has_table_of_contents: bool,
}

impl From<&RenderedPost> for PostData {
    fn from(rendered: &RenderedPost) -> Self {
        Self {
            title: rendered.title.clone(),
            title_id: rendered.title_id.clone(),
            has_table_of_contents: rendered.has_table_of_contents,
        }
    }
}

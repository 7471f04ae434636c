//! Askama template definitions.

use askama::Template;

/// Tag link shown under a post title
#[derive(Debug, Clone)]
pub struct TagLink {
    pub name: String,
    pub href: String,
}

/// A related post in the page footer
#[derive(Debug, Clone)]
pub struct RelatedEntry {
    pub href: String,
    pub title: String,
    pub display_date: String,
}

/// A post entry in the index list
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub href: String,
    pub title: String,
    pub display_date: String,
    pub iso_date: String,
    pub tags: Vec<String>,
    /// JSON array of the tags, for client-side filtering
    pub tags_json: String,
}

#[derive(Debug, Clone)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

/// Post page template
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    // Site metadata
    pub site_title: String,
    pub site_author: String,
    pub language: String,
    pub year: i32,

    // Navigation
    pub home_href: String,
    pub feed_href: String,
    pub canonical_url: String,

    // Page metadata
    pub page_title: String,
    pub description: String,
    pub keywords: String,

    // Post
    pub title: String,
    pub title_id: String,
    pub display_date: String,
    pub iso_date: String,
    pub tags: Vec<TagLink>,
    pub content: String,
    pub toc_html: Option<String>,
    pub has_toc: bool,
    pub related: Vec<RelatedEntry>,

    /// Serialized `PostData`, already safe to place inside `<script>`
    pub post_data_json: String,
}

/// Index page template
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    // Site metadata
    pub site_title: String,
    pub site_author: String,
    pub language: String,
    pub year: i32,

    // Navigation
    pub home_href: String,
    pub feed_href: String,
    pub canonical_url: String,

    pub page_title: String,
    pub description: String,

    pub posts: Vec<IndexEntry>,
    pub tags: Vec<TagCount>,
}

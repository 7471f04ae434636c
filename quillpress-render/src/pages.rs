//! Whole-page rendering on top of the templates.

use crate::templates::{
    IndexEntry, IndexTemplate, PostTemplate, RelatedEntry, TagCount, TagLink,
};
use askama::Template;
use chrono::Datelike;
use quillpress_core::loader::tag_counts;
use quillpress_core::markdown::render_toc;
use quillpress_core::{Config, Post, PostData, RenderedPost};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize the client contract for a post page.
///
/// `</` is escaped so the JSON can never close the surrounding `<script>`.
pub fn post_data_json(rendered: &RenderedPost) -> Result<String, RenderError> {
    let json = serde_json::to_string(&PostData::from(rendered))?;
    Ok(json.replace("</", "<\\/"))
}

/// Renders post and index pages for one site configuration
#[derive(Debug, Clone)]
pub struct PageRenderer {
    config: Config,
    year: i32,
}

impl PageRenderer {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            year: chrono::Utc::now().year(),
        }
    }

    /// Fixed copyright year, for reproducible output
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    fn home_href(&self) -> String {
        format!("{}index.html", self.config.normalized_base_url())
    }

    fn feed_href(&self) -> String {
        format!(
            "{}{}",
            self.config.normalized_base_url(),
            quillpress_core::config::FEED_FILENAME
        )
    }

    fn tag_href(&self, tag: &str) -> String {
        format!("{}#{}", self.home_href(), tag)
    }

    pub fn render_post(
        &self,
        post: &Post,
        rendered: &RenderedPost,
        related: &[&Post],
    ) -> Result<String, RenderError> {
        let site = &self.config.site;
        let description = post
            .description
            .clone()
            .unwrap_or_else(|| rendered.excerpt.clone());
        let toc_html = render_toc(&rendered.headings);

        let template = PostTemplate {
            site_title: site.title.clone(),
            site_author: site.author.clone(),
            language: site.language.clone(),
            year: self.year,
            home_href: self.home_href(),
            feed_href: self.feed_href(),
            canonical_url: self.config.absolute_url(&self.config.post_href(&post.id)),
            page_title: format!("{} | {}", rendered.title, site.title),
            description,
            keywords: post.tags.join(", "),
            title: rendered.title.clone(),
            title_id: rendered.title_id.clone(),
            display_date: post.display_date(),
            iso_date: post.iso_date(),
            tags: post
                .tags
                .iter()
                .map(|tag| TagLink {
                    name: tag.clone(),
                    href: self.tag_href(tag),
                })
                .collect(),
            content: rendered.content_html.clone(),
            has_toc: rendered.has_table_of_contents,
            toc_html,
            related: related
                .iter()
                .map(|p| RelatedEntry {
                    href: self.config.post_href(&p.id),
                    title: p.title.clone(),
                    display_date: p.display_date(),
                })
                .collect(),
            post_data_json: post_data_json(rendered)?,
        };
        Ok(template.render()?)
    }

    /// Index of every post, newest first, with the tag filter bar
    pub fn render_index(&self, posts: &[Post]) -> Result<String, RenderError> {
        let site = &self.config.site;
        let entries = posts
            .iter()
            .map(|p| {
                Ok(IndexEntry {
                    id: p.id.clone(),
                    href: self.config.post_href(&p.id),
                    title: p.title.clone(),
                    display_date: p.display_date(),
                    iso_date: p.iso_date(),
                    tags: p.tags.clone(),
                    tags_json: serde_json::to_string(&p.tags)?,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;

        let template = IndexTemplate {
            site_title: site.title.clone(),
            site_author: site.author.clone(),
            language: site.language.clone(),
            year: self.year,
            home_href: self.home_href(),
            feed_href: self.feed_href(),
            canonical_url: self.config.absolute_url(""),
            page_title: site.title.clone(),
            description: site.description.clone(),
            posts: entries,
            tags: tag_counts(posts)
                .into_iter()
                .map(|(name, count)| TagCount { name, count })
                .collect(),
        };
        Ok(template.render()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use quillpress_core::config::SiteConfig;
    use quillpress_core::MarkdownTransformer;
    use std::path::PathBuf;

    fn config() -> Config {
        Config::new(SiteConfig {
            title: "Field Notes".into(),
            author: "Sam".into(),
            description: "Writing things down".into(),
            url: "https://example.com".into(),
            language: "en-us".into(),
        })
    }

    fn post(id: &str, title: &str, day: u32, tags: &[&str], body: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
            raw_markdown: body.into(),
            body_markdown: body.into(),
            source_path: PathBuf::from(format!("{id}.md")),
        }
    }

    fn render(post: &Post, related: &[&Post]) -> String {
        let config = config();
        let rendered = MarkdownTransformer::new(config.normalized_base_url()).render(post);
        PageRenderer::new(&config)
            .with_year(2024)
            .render_post(post, &rendered, related)
            .unwrap()
    }

    #[test]
    fn test_post_page_embeds_client_contract() {
        let p = post(
            "hello",
            "Hello World",
            5,
            &["rust"],
            "# Hello World\n\n## Setup\n\nText.\n",
        );
        let html = render(&p, &[]);

        assert!(html.contains(
            r#"window.__POST_DATA__ = {"title":"Hello World","titleId":"hello-world","hasTableOfContents":true};"#
        ));
        assert!(html.contains(r#"<h1 class="headingXl" id="hello-world">Hello World</h1>"#));
        assert!(html.contains("href=\"#hello-world\""));
        assert!(html.contains(r#"<nav class="toc">"#));
        assert!(html.contains(r#"<div class="markdown-content">"#));
        assert!(html.contains(r#"<meta name="keywords" content="rust">"#));
    }

    #[test]
    fn test_post_page_without_toc() {
        let p = post("plain", "Plain", 5, &[], "# Plain\n\nJust words.\n");
        let html = render(&p, &[]);
        assert!(html.contains("\"hasTableOfContents\":false"));
        assert!(html.contains("postPage noToc"));
        assert!(!html.contains("tocContainer"));
        assert!(!html.contains("relatedPostsFooter"));
    }

    #[test]
    fn test_post_page_lists_related() {
        let p = post("a", "A", 5, &["rust"], "# A\n\nbody\n");
        let other = post("b", "Borrowing basics", 2, &["rust"], "# B\n");
        let html = render(&p, &[&other]);
        assert!(html.contains(r#"<a href="/posts/b.html">Borrowing basics</a>"#));
        assert!(html.contains("March 2, 2024"));
    }

    #[test]
    fn test_post_data_json_cannot_close_script() {
        let p = post("x", "Ends </script> here", 1, &[], "# Ends </script> here\n");
        let rendered = MarkdownTransformer::new("/").render(&p);
        let json = post_data_json(&rendered).unwrap();
        assert!(!json.contains("</"));
        assert!(json.contains(r"<\/script>"));
    }

    #[test]
    fn test_index_lists_posts_and_tags() {
        let posts = vec![
            post("new", "Newest", 9, &["rust", "web"], "# Newest\n"),
            post("old", "Oldest", 1, &["rust"], "# Oldest\n"),
        ];
        let html = PageRenderer::new(&config())
            .with_year(2024)
            .render_index(&posts)
            .unwrap();

        let new_at = html.find(r#"data-id="new""#).unwrap();
        let old_at = html.find(r#"data-id="old""#).unwrap();
        assert!(new_at < old_at);
        assert!(html.contains(r#"<a href="/posts/new.html">Newest</a>"#));
        assert!(html.contains(r#"<span class="tag" data-tag="web">web <small>(1)</small></span>"#));
        assert!(html.contains(r#"<span class="tag" data-tag="rust">rust <small>(2)</small></span>"#));
        assert!(html.contains("href=\"/rss.xml\""));
    }

    #[test]
    fn test_post_data_json_snapshot() {
        let p = post("n", "Notes", 1, &[], "# Notes & More\n\nbody\n");
        let rendered = MarkdownTransformer::new("/").render(&p);
        insta::assert_snapshot!(
            post_data_json(&rendered).unwrap(),
            @r#"{"title":"Notes & More","titleId":"notes-more","hasTableOfContents":false}"#
        );
    }
}

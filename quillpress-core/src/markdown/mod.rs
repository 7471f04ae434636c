//! Markdown processing pipeline.
//!
//! Order matters: the title heading is split off the body, the body is
//! parsed into events, heading ids / table wrappers / highlighted code are
//! applied on the event stream, and the trailing hashtag rewrite runs on the
//! rendered HTML.

pub mod entities;
pub mod hashtags;
pub mod highlight;

use crate::models::{Heading, Post, RenderedPost};
use crate::slug::{dedupe_slug, heading_slug};
use crate::text::{escape_html, html_to_text, truncate_graphemes};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

pub use entities::normalize_code_entities;
pub use hashtags::link_trailing_hashtags;
pub use highlight::HighlightTransformer;

const DEFAULT_EXCERPT_LENGTH: usize = 160;

/// Markdown to HTML transformer for post bodies
pub struct MarkdownTransformer {
    options: Options,
    base_url: String,
    excerpt_length: usize,
    highlighter: HighlightTransformer,
}

/// HTML plus the headings found while converting
#[derive(Debug, Clone)]
pub struct Converted {
    pub html: String,
    pub headings: Vec<Heading>,
}

impl MarkdownTransformer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        Self {
            options,
            base_url: base_url.into(),
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            highlighter: HighlightTransformer::new(),
        }
    }

    pub fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    /// Render a post body: title split off, HTML produced, headings collected
    pub fn render(&self, post: &Post) -> RenderedPost {
        let (heading_title, body) = split_title(&post.body_markdown);
        let title = heading_title.unwrap_or_else(|| post.title.clone());
        let title_id = heading_slug(&escape_html(&title));

        let mut seen = HashMap::new();
        seen.insert(title_id.clone(), 1);
        let converted = self.convert_with_seen(&body, &mut seen);

        let has_table_of_contents = converted
            .headings
            .iter()
            .any(|h| h.level == 2 || h.level == 3);
        let excerpt = make_excerpt(&converted.html, self.excerpt_length);

        RenderedPost {
            title,
            title_id,
            content_html: converted.html,
            headings: converted.headings,
            has_table_of_contents,
            excerpt,
        }
    }

    /// Convert a markdown fragment to HTML
    pub fn convert(&self, markdown: &str) -> Converted {
        self.convert_with_seen(markdown, &mut HashMap::new())
    }

    fn convert_with_seen(&self, markdown: &str, seen: &mut HashMap<String, usize>) -> Converted {
        let parser = Parser::new_ext(markdown, self.options);
        let events: Vec<Event> = parser.collect();

        let headings = collect_headings(&events, seen);
        let events = attach_heading_ids(events, &headings);
        let events = wrap_tables(events);
        let events = self.highlighter.transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Converted {
            html: link_trailing_hashtags(&html_output, &self.base_url),
            headings,
        }
    }
}

/// Split the first top-level `# ` heading off a markdown body.
///
/// Returns the heading text (if any) and the body with that line removed.
/// Lines inside fenced code blocks are never treated as the title.
pub fn split_title(markdown: &str) -> (Option<String>, String) {
    let mut in_fence = false;
    let mut title = None;
    let mut kept = Vec::new();

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if title.is_none() && !in_fence {
            if let Some(text) = line.strip_prefix("# ") {
                let text = text.trim().trim_end_matches('#').trim();
                if !text.is_empty() {
                    title = Some(text.to_string());
                    continue;
                }
            }
        }
        kept.push(line);
    }

    let mut body = kept.join("\n");
    if markdown.ends_with('\n') {
        body.push('\n');
    }
    (title, body)
}

fn collect_headings(events: &[Event], seen: &mut HashMap<String, usize>) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut current: Option<(u32, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((*level as u32, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, ref mut buf)) = current {
                    buf.push_str(text.as_ref());
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let text = text.trim().to_string();
                    let id = dedupe_slug(heading_slug(&escape_html(&text)), seen);
                    headings.push(Heading { level, text, id });
                }
            }
            _ => {}
        }
    }

    headings
}

fn attach_heading_ids<'a>(events: Vec<Event<'a>>, headings: &[Heading]) -> Vec<Event<'a>> {
    let mut heading_iter = headings.iter();

    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading {
                level,
                id: _,
                classes,
                attrs,
            }) => {
                let id = heading_iter
                    .next()
                    .map(|h| CowStr::Boxed(h.id.clone().into_boxed_str()));
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                })
            }
            other => other,
        })
        .collect()
}

fn wrap_tables(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut result = Vec::with_capacity(events.len());
    for event in events {
        match event {
            Event::Start(Tag::Table(alignments)) => {
                result.push(Event::Html(CowStr::Borrowed(
                    "<div class=\"table-wrapper\">",
                )));
                result.push(Event::Start(Tag::Table(alignments)));
            }
            Event::End(TagEnd::Table) => {
                result.push(Event::End(TagEnd::Table));
                result.push(Event::Html(CowStr::Borrowed("</div>\n")));
            }
            other => result.push(other),
        }
    }
    result
}

/// Table of contents for level 2 and 3 headings
pub fn render_toc(headings: &[Heading]) -> Option<String> {
    let entries: Vec<&Heading> = headings
        .iter()
        .filter(|h| h.level == 2 || h.level == 3)
        .collect();
    if entries.is_empty() {
        return None;
    }

    let mut html = String::from(r#"<nav class="toc"><h2 class="toc-title">Contents</h2><ul class="toc-list">"#);
    for h in entries {
        html.push_str(&format!(
            r##"<li class="toc-level-{}"><a href="#{}">{}</a></li>"##,
            h.level,
            h.id,
            escape_html(&h.text)
        ));
    }
    html.push_str("</ul></nav>");
    Some(html)
}

fn make_excerpt(html: &str, max: usize) -> String {
    let text = html_to_text(html);
    let cut = truncate_graphemes(&text, max);
    if cut.len() < text.len() {
        format!("{}...", cut.trim_end())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn post(body: &str) -> Post {
        Post {
            id: "sample".into(),
            title: "Fallback".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            tags: vec![],
            description: None,
            raw_markdown: body.into(),
            body_markdown: body.into(),
            source_path: PathBuf::from("sample.md"),
        }
    }

    #[test]
    fn test_title_extracted_and_removed() {
        let rendered = MarkdownTransformer::new("/").render(&post("# My Title\n\nHello **there**.\n"));
        assert_eq!(rendered.title, "My Title");
        assert_eq!(rendered.title_id, "my-title");
        assert!(!rendered.content_html.contains("My Title"));
        assert!(rendered.content_html.contains("<strong>there</strong>"));
    }

    #[test]
    fn test_title_falls_back_to_post_title() {
        let rendered = MarkdownTransformer::new("/").render(&post("Just text.\n"));
        assert_eq!(rendered.title, "Fallback");
        assert_eq!(rendered.title_id, "fallback");
    }

    #[test]
    fn test_split_title_ignores_fenced_code() {
        let (title, body) = split_title("```sh\n# not a title\n```\n# Real\ntext\n");
        assert_eq!(title.as_deref(), Some("Real"));
        assert_eq!(body, "```sh\n# not a title\n```\ntext\n");
    }

    #[test]
    fn test_heading_ids_use_canonical_slug() {
        let converted = MarkdownTransformer::new("/").convert("## Tips &amp; Tricks\n\n### `Vec<T>` notes\n");
        assert!(converted.html.contains(r#"<h2 id="tips-tricks">"#));
        assert!(converted.html.contains(r#"<h3 id="vec-t-notes">"#));
        assert_eq!(converted.headings[0].id, heading_slug("Tips & Tricks"));
    }

    #[test]
    fn test_duplicate_headings_get_suffix() {
        let converted = MarkdownTransformer::new("/").convert("## Setup\n\n## Setup\n");
        let ids: Vec<&str> = converted.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-1"]);
    }

    #[test]
    fn test_body_heading_matching_title_does_not_collide() {
        let rendered = MarkdownTransformer::new("/").render(&post("# Intro\n\n## Intro\n"));
        assert_eq!(rendered.title_id, "intro");
        assert_eq!(rendered.headings[0].id, "intro-1");
    }

    #[test]
    fn test_tables_are_wrapped() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |\n";
        let html = MarkdownTransformer::new("/").convert(md).html;
        assert!(html.contains("<div class=\"table-wrapper\"><table>"));
        assert!(html.contains("</table>\n</div>"));
    }

    #[test]
    fn test_code_blocks_are_highlighted() {
        let md = "```rust\nlet v: Vec<u8> = Vec::new();\n```\n";
        let html = MarkdownTransformer::new("/").convert(md).html;
        assert!(html.contains("<pre class=\"language-rust\"><code class=\"language-rust\">"));
        assert!(html.contains("syntax-"));
        assert!(!html.contains("<u8>"));
    }

    #[test]
    fn test_unknown_language_still_renders() {
        let md = "```klingon\nqapla' <batlh>\n```\n";
        let html = MarkdownTransformer::new("/").convert(md).html;
        assert!(html.contains("language-klingon"));
        assert!(html.contains("&lt;batlh&gt;"));
    }

    #[test]
    fn test_trailing_hashtags_linked() {
        let rendered =
            MarkdownTransformer::new("/").render(&post("# T\n\nA #mid tag.\n\n#rust #cli\n"));
        assert!(rendered.content_html.contains("<p>A #mid tag.</p>"));
        assert!(rendered
            .content_html
            .contains(r##"<p class="post-hashtags"><a href="/index.html#rust">#rust</a>"##));
    }

    #[test]
    fn test_has_table_of_contents() {
        let t = MarkdownTransformer::new("/");
        assert!(t.render(&post("# T\n\n## Section\n")).has_table_of_contents);
        assert!(t.render(&post("# T\n\n### Sub\n")).has_table_of_contents);
        assert!(!t.render(&post("# T\n\n#### Deep\n")).has_table_of_contents);
    }

    #[test]
    fn test_render_toc_anchors_match_heading_ids() {
        let converted = MarkdownTransformer::new("/").convert("## One\n\n### Two & Three\n\n#### Four\n");
        let toc = render_toc(&converted.headings).unwrap();
        assert!(toc.contains(r##"<a href="#one">One</a>"##));
        assert!(toc.contains(r##"<a href="#two-three">Two &amp; Three</a>"##));
        assert!(!toc.contains("four"));
        assert!(converted.html.contains(r#"<h3 id="two-three">"#));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "word ".repeat(100);
        let rendered = MarkdownTransformer::new("/").with_excerpt_length(20).render(&post(&long));
        assert!(rendered.excerpt.ends_with("..."));
        assert!(rendered.excerpt.len() <= 23);
    }

    #[test]
    fn test_render_toc_snapshot() {
        let headings = vec![
            Heading {
                level: 2,
                text: "Setup".into(),
                id: "setup".into(),
            },
            Heading {
                level: 3,
                text: "Step <1>".into(),
                id: "step-1".into(),
            },
        ];
        insta::assert_snapshot!(
            render_toc(&headings).unwrap(),
            @r##"<nav class="toc"><h2 class="toc-title">Contents</h2><ul class="toc-list"><li class="toc-level-2"><a href="#setup">Setup</a></li><li class="toc-level-3"><a href="#step-1">Step &lt;1&gt;</a></li></ul></nav>"##
        );
    }
}

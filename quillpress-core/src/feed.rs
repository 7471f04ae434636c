//! RSS feed generation from the rendered pages.
//!
//! The feed is built after every post page has been written: item bodies
//! are read back from `posts/{id}.html` so syndication readers and the search
//! engine see exactly what the page shows.

use crate::config::Config;
use crate::models::Post;
use crate::text::{escape_xml, html_to_text, truncate_graphemes};
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Class of the element wrapping the article body on post pages
pub const CONTENT_CLASS: &str = "markdown-content";

const GENERATOR: &str = concat!("quillpress ", env!("CARGO_PKG_VERSION"));
const DESCRIPTION_LENGTH: usize = 160;

static CONTENT_OPEN: OnceLock<Regex> = OnceLock::new();
static DIV_TAG: OnceLock<Regex> = OnceLock::new();
static SPAN_TAG: OnceLock<Regex> = OnceLock::new();

fn content_open() -> &'static Regex {
    CONTENT_OPEN.get_or_init(|| {
        Regex::new(r#"<div\s+class="markdown-content"[^>]*>"#).unwrap()
    })
}

fn div_tag() -> &'static Regex {
    DIV_TAG.get_or_init(|| Regex::new(r"<div\b[^>]*>|</div\s*>").unwrap())
}

fn span_tag() -> &'static Regex {
    SPAN_TAG.get_or_init(|| Regex::new(r"</?span(?:\s[^>]*)?>").unwrap())
}

/// Inner HTML of the `markdown-content` div of a rendered page
pub fn extract_article_html(page: &str) -> Option<String> {
    let open = content_open().find(page)?;
    let start = open.end();
    let mut depth = 1usize;

    for tag in div_tag().find_iter(&page[start..]) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(page[start..start + tag.start()].trim().to_string());
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Drop syntax-highlight `<span>` wrappers, keeping their text
pub fn strip_highlight_spans(html: &str) -> String {
    span_tag().replace_all(html, "").into_owned()
}

/// RFC 822 style date used by RSS readers, e.g. "Tue, 02 Jan 2024 00:00:00 GMT"
pub fn rss_date(date: &NaiveDate) -> String {
    date.and_time(chrono::NaiveTime::MIN)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

fn cdata(content: &str) -> String {
    format!("<![CDATA[{}]]>", content.replace("]]>", "]]]]><![CDATA[>"))
}

/// One feed item: post metadata plus the body HTML read back from its page
#[derive(Debug, Clone)]
pub struct FeedItem<'a> {
    pub post: &'a Post,
    pub content_html: String,
}

/// Serialize the channel and its items as RSS 2.0
pub fn build_feed(config: &Config, items: &[FeedItem<'_>], now: DateTime<Utc>) -> String {
    let site_link = config.absolute_url("");
    let feed_link = config.absolute_url(crate::config::FEED_FILENAME);
    let now_rss = now.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
    let pub_date = items
        .first()
        .map(|item| rss_date(&item.post.date))
        .unwrap_or_else(|| now_rss.clone());

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\">\n");
    xml.push_str("  <channel>\n");
    xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&config.site.title)));
    xml.push_str(&format!(
        "    <description>{}</description>\n",
        escape_xml(&config.site.description)
    ));
    xml.push_str(&format!("    <link>{}</link>\n", escape_xml(&site_link)));
    xml.push_str(&format!(
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(&feed_link)
    ));
    xml.push_str(&format!("    <language>{}</language>\n", escape_xml(&config.site.language)));
    xml.push_str(&format!("    <pubDate>{}</pubDate>\n", pub_date));
    xml.push_str(&format!("    <lastBuildDate>{}</lastBuildDate>\n", now_rss));
    xml.push_str(&format!("    <generator>{}</generator>\n", GENERATOR));
    xml.push_str("    <ttl>60</ttl>\n");

    for item in items {
        let post = item.post;
        let link = config.absolute_url(&config.post_href(&post.id));
        let description = post.description.clone().unwrap_or_else(|| {
            let text = html_to_text(&item.content_html);
            truncate_graphemes(&text, DESCRIPTION_LENGTH).to_string()
        });

        xml.push_str("    <item>\n");
        xml.push_str(&format!("      <title>{}</title>\n", escape_xml(&post.title)));
        xml.push_str(&format!("      <link>{}</link>\n", escape_xml(&link)));
        xml.push_str(&format!(
            "      <guid isPermaLink=\"true\">{}</guid>\n",
            escape_xml(&link)
        ));
        xml.push_str(&format!("      <pubDate>{}</pubDate>\n", rss_date(&post.date)));
        for tag in &post.tags {
            xml.push_str(&format!("      <category>{}</category>\n", escape_xml(tag)));
        }
        xml.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&description)
        ));
        xml.push_str(&format!(
            "      <content:encoded>{}</content:encoded>\n",
            cdata(&item.content_html)
        ));
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n</rss>\n");
    xml
}

/// Summary of a feed write
#[derive(Debug, Clone)]
pub struct FeedStats {
    pub path: PathBuf,
    pub items: usize,
    pub skipped: Vec<String>,
}

/// Read every rendered post page back and write the feed to its well-known path.
///
/// Must run after all post pages are written. Posts whose page is missing
/// or has no article body are skipped with a warning.
pub fn write_feed(config: &Config, posts: &[Post]) -> Result<FeedStats, FeedError> {
    let pages_dir = config.post_pages_dir();
    let mut items = Vec::with_capacity(posts.len());
    let mut skipped = Vec::new();

    for post in posts {
        let page_path = pages_dir.join(format!("{}.html", post.id));
        let page = match fs::read_to_string(&page_path) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Skipping {} in feed, cannot read {:?}: {}", post.id, page_path, e);
                skipped.push(post.id.clone());
                continue;
            }
        };
        match extract_article_html(&page) {
            Some(body) => items.push(FeedItem {
                post,
                content_html: strip_highlight_spans(&body),
            }),
            None => {
                tracing::warn!("Skipping {} in feed, no {} element", post.id, CONTENT_CLASS);
                skipped.push(post.id.clone());
            }
        }
    }

    let xml = build_feed(config, &items, Utc::now());
    let path = config.feed_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, xml)?;
    tracing::info!("Generated {} with {} items", crate::config::FEED_FILENAME, items.len());

    Ok(FeedStats {
        path,
        items: items.len(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn config() -> Config {
        Config::new(SiteConfig {
            title: "Blog & Co".into(),
            author: "A".into(),
            description: "Thoughts".into(),
            url: "https://example.com".into(),
            language: "en-us".into(),
        })
    }

    fn post(id: &str, tags: &[&str]) -> Post {
        Post {
            id: id.into(),
            title: format!("{id} <title>"),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
            raw_markdown: String::new(),
            body_markdown: String::new(),
            source_path: PathBuf::from(format!("{id}.md")),
        }
    }

    #[test]
    fn test_extract_article_html_handles_nested_divs() {
        let page = r#"<html><body><div class="page"><div class="markdown-content">
<p>Hi</p><div class="table-wrapper"><table></table></div><p>After</p>
</div><footer>x</footer></div></body></html>"#;
        let body = extract_article_html(page).unwrap();
        assert!(body.starts_with("<p>Hi</p>"));
        assert!(body.ends_with("<p>After</p>"));
        assert!(!body.contains("footer"));
    }

    #[test]
    fn test_extract_article_html_missing() {
        assert!(extract_article_html("<p>no article</p>").is_none());
    }

    #[test]
    fn test_strip_highlight_spans() {
        let html = r#"<code><span class="syntax-keyword">fn</span> main</code>"#;
        assert_eq!(strip_highlight_spans(html), "<code>fn main</code>");
    }

    #[test]
    fn test_highlighted_code_survives_span_stripping() {
        let md = "```rust\nlet v: Vec<u8> = Vec::new();\n```\n\n```html\n<div>hi</div>\n```\n";
        let page_body = crate::MarkdownTransformer::new("/").convert(md).html;
        let body = strip_highlight_spans(&page_body);

        assert!(!body.contains("<u8>"));
        assert!(!body.contains("<div>hi"));

        let p = post("code", &["rust"]);
        let items = vec![FeedItem {
            post: &p,
            content_html: body,
        }];
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let xml = build_feed(&config(), &items, now);

        let docs = crate::search::parse_feed(&xml).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.contains("let v: Vec<u8> = Vec::new();"));
        assert!(docs[0].content.contains("<div>hi</div>"));
    }

    #[test]
    fn test_rss_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(rss_date(&date), "Tue, 02 Jan 2024 00:00:00 GMT");
    }

    #[test]
    fn test_build_feed_items() {
        let config = config();
        let p = post("hello", &["rust", "web"]);
        let items = vec![FeedItem {
            post: &p,
            content_html: "<p>Body ]]> end</p>".into(),
        }];
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let xml = build_feed(&config, &items, now);

        assert!(xml.contains("<title>Blog &amp; Co</title>"));
        assert!(xml.contains(r#"<atom:link href="https://example.com/rss.xml" rel="self""#));
        assert!(xml.contains("<lastBuildDate>Thu, 01 Feb 2024 12:00:00 GMT</lastBuildDate>"));
        assert!(xml.contains("<title>hello &lt;title&gt;</title>"));
        assert!(xml.contains(
            r#"<guid isPermaLink="true">https://example.com/posts/hello.html</guid>"#
        ));
        assert!(xml.contains("<category>rust</category>"));
        assert!(xml.contains("<category>web</category>"));
        assert!(xml.contains("<![CDATA[<p>Body ]]]]><![CDATA[> end</p>]]>"));
    }

    #[test]
    fn test_write_feed_reads_rendered_pages() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.paths.output = dir.path().to_path_buf();
        fs::create_dir_all(config.post_pages_dir()).unwrap();
        fs::write(
            config.post_pages_dir().join("a.html"),
            r#"<div class="markdown-content"><p><span class="x">shown</span> text</p></div>"#,
        )
        .unwrap();

        let posts = vec![post("a", &[]), post("missing", &[])];
        let stats = write_feed(&config, &posts).unwrap();
        assert_eq!(stats.items, 1);
        assert_eq!(stats.skipped, vec!["missing"]);

        let xml = fs::read_to_string(config.feed_path()).unwrap();
        assert!(xml.contains("<![CDATA[<p>shown text</p>]]>"));
        assert!(xml.contains("<description>shown text</description>"));
    }
}

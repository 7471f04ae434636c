//! Trailing hashtag paragraphs become links back to the tag-filtered index.
//!
//! Only the last two lines of the rendered body are inspected, so a `#word`
//! used mid-article stays plain prose.

use regex::Regex;
use std::sync::OnceLock;

static HASHTAG_PARAGRAPH: OnceLock<Regex> = OnceLock::new();
static HASHTAG: OnceLock<Regex> = OnceLock::new();

fn hashtag_paragraph() -> &'static Regex {
    HASHTAG_PARAGRAPH
        .get_or_init(|| Regex::new(r"^<p>((?:#[A-Za-z0-9_-]+[ \t]*)+)</p>$").unwrap())
}

fn hashtag() -> &'static Regex {
    HASHTAG.get_or_init(|| Regex::new(r"#([A-Za-z0-9_-]+)").unwrap())
}

/// Rewrite hashtag-only paragraphs on the last two non-empty lines of `html`
pub fn link_trailing_hashtags(html: &str, base_url: &str) -> String {
    let mut lines: Vec<String> = html.lines().map(str::to_string).collect();
    let tail: Vec<usize> = lines
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, line)| !line.trim().is_empty())
        .take(2)
        .map(|(idx, _)| idx)
        .collect();

    for idx in tail {
        let trimmed = lines[idx].trim();
        let Some(caps) = hashtag_paragraph().captures(trimmed) else {
            continue;
        };
        let links: Vec<String> = hashtag()
            .captures_iter(&caps[1])
            .map(|c| {
                let tag = &c[1];
                format!(r#"<a href="{}index.html#{}">#{}</a>"#, base_url, tag, tag)
            })
            .collect();
        lines[idx] = format!(r#"<p class="post-hashtags">{}</p>"#, links.join(" "));
    }

    let mut out = lines.join("\n");
    if html.ends_with('\n') {
        out.push('\n');
    }
    out
}

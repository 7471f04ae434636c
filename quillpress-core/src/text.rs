//! Small HTML/XML text helpers shared by the transformer, feed and search.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static IMG_REGEX: OnceLock<Regex> = OnceLock::new();
static ENTITY_REGEX: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn img_regex() -> &'static Regex {
    IMG_REGEX.get_or_init(|| Regex::new(r"(?i)<img[^>]*>").unwrap())
}

fn entity_regex() -> &'static Regex {
    ENTITY_REGEX.get_or_init(|| Regex::new(r"&(#(?:[xX][0-9a-fA-F]+|\d+)|[a-zA-Z]+);").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Remove every tag, keeping text content as-is (entities untouched)
pub fn strip_tags(html: &str) -> String {
    tag_regex().replace_all(html, "").into_owned()
}

/// Remove `<img>` tags only
pub fn strip_images(html: &str) -> String {
    img_regex().replace_all(html, "").into_owned()
}

/// Decode named and numeric character references.
///
/// Unknown named entities are left verbatim.
pub fn decode_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &regex::Captures| {
            let code = &caps[1];
            if let Some(num) = code.strip_prefix('#') {
                let parsed = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16),
                    None => num.parse::<u32>(),
                };
                return parsed
                    .ok()
                    .and_then(char::from_u32)
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| caps[0].to_string());
            }
            match code {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                "nbsp" => "\u{00A0}".to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Visible text of an HTML fragment: images dropped, tags stripped,
/// entities decoded, whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let without_images = strip_images(html);
    let stripped = strip_tags(&without_images);
    let decoded = decode_entities(&stripped);
    whitespace_regex()
        .replace_all(decoded.trim(), " ")
        .into_owned()
}

/// Truncate to at most `max` grapheme clusters, never splitting a character
pub fn truncate_graphemes(text: &str, max: usize) -> &str {
    match text.grapheme_indices(true).nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;T&gt;"), "<T>");
        assert_eq!(decode_entities("it&#39;s &#x41;"), "it's A");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_html_to_text_drops_images_first() {
        let html = r#"<p>Hello <img src="x.png" alt="pic"> <em>world</em> &amp; co</p>"#;
        assert_eq!(html_to_text(html), "Hello world & co");
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("héllo", 2), "hé");
        assert_eq!(truncate_graphemes("hi", 10), "hi");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
    }
}

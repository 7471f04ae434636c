//! Query scoring, ordering and highlighting.
//!
//! [`score_document`] is the one scoring function; everything that ranks
//! documents (the engine, the CLI) goes through [`rank`].

use super::SearchDocument;
use crate::text::escape_html;
use regex::{Regex, RegexBuilder};
use std::cmp::Reverse;

pub const TITLE_WEIGHT: u32 = 10;
pub const CONTENT_WEIGHT: u32 = 1;
pub const CATEGORY_BONUS: u32 = 3;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub total: u32,
    /// The whole query appears in the title
    pub title_match: bool,
    /// The whole query appears in one of the categories
    pub tag_match: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct RankedDocument<'a> {
    pub document: &'a SearchDocument,
    pub score: Score,
}

/// Lowercased whitespace-separated terms
pub fn query_terms(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

pub fn score_document(doc: &SearchDocument, query: &str) -> Score {
    let whole = query.trim().to_lowercase();
    if whole.is_empty() {
        return Score::default();
    }

    let title = doc.title.to_lowercase();
    let content = doc.content.to_lowercase();
    let categories: Vec<String> = doc.categories.iter().map(|c| c.to_lowercase()).collect();

    let mut total = 0;
    for term in query_terms(&whole) {
        if !doc.search_text.contains(&term) {
            continue;
        }
        total += TITLE_WEIGHT * title.matches(&term).count() as u32;
        total += CONTENT_WEIGHT * content.matches(&term).count() as u32;
        let tagged = categories.iter().filter(|c| c.contains(&term)).count() as u32;
        total += CATEGORY_BONUS * tagged;
    }

    Score {
        total,
        title_match: title.contains(&whole),
        tag_match: categories.iter().any(|c| c.contains(&whole)),
    }
}

/// Score and order `docs` for `query`.
///
/// Zero-score documents are dropped. Whole-query title matches come first,
/// then whole-query tag matches, then descending score; ties keep feed order.
/// A blank query returns every document in its original order.
pub fn rank<'a>(docs: &'a [SearchDocument], query: &str) -> Vec<RankedDocument<'a>> {
    if query.trim().is_empty() {
        return docs
            .iter()
            .map(|document| RankedDocument {
                document,
                score: Score::default(),
            })
            .collect();
    }

    let mut ranked: Vec<RankedDocument<'a>> = docs
        .iter()
        .map(|document| RankedDocument {
            document,
            score: score_document(document, query),
        })
        .filter(|r| r.score.total > 0)
        .collect();

    ranked.sort_by_key(|r| {
        (
            !r.score.title_match,
            !r.score.tag_match,
            Reverse(r.score.total),
        )
    });
    ranked
}

fn pattern(needle: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Escaped title with the first whole-query match wrapped in `<mark>`
pub fn highlight_title(title: &str, query: &str) -> String {
    let query = query.trim();
    let found = if query.is_empty() {
        None
    } else {
        pattern(query).and_then(|re| re.find(title))
    };

    match found {
        Some(m) => format!(
            "{}<mark>{}</mark>{}",
            escape_html(&title[..m.start()]),
            escape_html(m.as_str()),
            escape_html(&title[m.end()..])
        ),
        None => escape_html(title),
    }
}

/// Highlighted excerpt of at most `max_len` characters around the first match.
///
/// Ellipses mark truncation at either end. Overlapping or adjacent term
/// matches are merged so no two `<mark>` spans overlap.
pub fn build_excerpt(content: &str, terms: &[String], max_len: usize) -> String {
    let text = content.trim();
    let patterns: Vec<Regex> = terms
        .iter()
        .filter(|t| !t.is_empty())
        .filter_map(|t| pattern(t))
        .collect();

    let anchor = patterns
        .iter()
        .filter_map(|re| re.find(text))
        .map(|m| m.start())
        .min()
        .unwrap_or(0);
    let (start, end) = excerpt_window(text, anchor, max_len);
    let window = &text[start..end];

    let spans = merge_spans(
        patterns
            .iter()
            .flat_map(|re| re.find_iter(window).map(|m| (m.start(), m.end())))
            .collect(),
    );

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    let mut cursor = 0;
    for (s, e) in spans {
        out.push_str(&escape_html(&window[cursor..s]));
        out.push_str("<mark>");
        out.push_str(&escape_html(&window[s..e]));
        out.push_str("</mark>");
        cursor = e;
    }
    out.push_str(&escape_html(&window[cursor..]));
    if end < text.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Byte range of a `max_len`-character window placing `anchor` near its start
fn excerpt_window(text: &str, anchor: usize, max_len: usize) -> (usize, usize) {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = boundaries.len() - 1;
    if chars <= max_len {
        return (0, text.len());
    }

    let anchor_char = boundaries.partition_point(|&b| b < anchor);
    let lead = max_len / 4;
    let start_char = anchor_char.saturating_sub(lead).min(chars - max_len);
    (boundaries[start_char], boundaries[start_char + max_len])
}

fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (s, e) in spans {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    merged
}

//! Canonical heading/title slugs.
//!
//! Every anchor on a page (table of contents, heading ids, the title id used by the
//! "back to top" link and `window.__POST_DATA__.titleId`) comes from [`heading_slug`].

use crate::text::{decode_entities, strip_tags};
use regex::Regex;
use std::sync::OnceLock;

static NON_SLUG_RUN: OnceLock<Regex> = OnceLock::new();

fn non_slug_run() -> &'static Regex {
    NON_SLUG_RUN.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Convert heading text (plain or HTML) to an anchor id
///
/// Rules:
/// - Strip residual tags, decode entities
/// - Lowercase
/// - Every run of characters outside `[a-z0-9]` becomes one hyphen
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use quillpress_core::heading_slug;
///
/// assert_eq!(heading_slug("Hello World"), "hello-world");
/// assert_eq!(heading_slug("Rust &amp; Safety"), "rust-safety");
/// assert_eq!(heading_slug("<code>Vec&lt;T&gt;</code> basics"), "vec-t-basics");
/// ```
pub fn heading_slug(input: &str) -> String {
    let text = decode_entities(&strip_tags(input));
    let lowered = text.to_lowercase();
    non_slug_run()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Make `slug` unique within one document by appending `-1`, `-2`, ...
pub fn dedupe_slug(slug: String, seen: &mut std::collections::HashMap<String, usize>) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    let result = if *count == 0 {
        slug
    } else {
        format!("{}-{}", slug, count)
    };
    *count += 1;
    result
}

//! Entity normalization for highlighted code.
//!
//! [`normalize_code_entities`] walks the code HTML and decides, for every
//! angle bracket in the text (encoded or literal), whether it must stay
//! encoded. A `<` whose next visible character is a letter, `/`, `!` or `?`
//! (generic syntax such as `Vec<T>`, bare `<T>`, or real tags like `<div>`)
//! is kept as `&lt;`, along with the `>` closing such a run. Comparisons
//! (`a < b`, `x >= y`) and arrows become literal characters.
//!
//! "Next visible" looks past highlighter `<span>` boundaries, so the output
//! stays safe after those wrappers are stripped. Other entity references
//! (`&amp;lt;`, `&amp;`) are user text and pass through unchanged. The
//! function is idempotent.

use regex::Regex;
use std::sync::OnceLock;

static SPAN_REGEX: OnceLock<Regex> = OnceLock::new();

fn span_regex() -> &'static Regex {
    SPAN_REGEX.get_or_init(|| Regex::new(r"</?span(?:\s[^>]*)?>").unwrap())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit<'a> {
    Span(&'a str),
    Lt,
    Gt,
    Char(char),
}

pub fn normalize_code_entities(html: &str) -> String {
    let units = tokenize(html);
    let mut out = String::with_capacity(html.len() + 8);
    let mut open = false;

    for (idx, unit) in units.iter().enumerate() {
        match *unit {
            Unit::Span(tag) => out.push_str(tag),
            Unit::Lt => {
                if starts_markup(&units[idx + 1..]) {
                    out.push_str("&lt;");
                    open = true;
                } else {
                    out.push('<');
                }
            }
            Unit::Gt if open => {
                out.push_str("&gt;");
                open = false;
            }
            Unit::Gt => out.push('>'),
            Unit::Char('\n') => {
                open = false;
                out.push('\n');
            }
            Unit::Char(c) => out.push(c),
        }
    }
    out
}

fn tokenize(html: &str) -> Vec<Unit<'_>> {
    let mut units = Vec::with_capacity(html.len());
    let mut last = 0;

    for m in span_regex().find_iter(html) {
        tokenize_text(&html[last..m.start()], &mut units);
        units.push(Unit::Span(m.as_str()));
        last = m.end();
    }
    tokenize_text(&html[last..], &mut units);
    units
}

fn tokenize_text<'a>(text: &'a str, units: &mut Vec<Unit<'a>>) {
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix("&lt;") {
            units.push(Unit::Lt);
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("&gt;") {
            units.push(Unit::Gt);
            rest = tail;
        } else {
            units.push(match c {
                '<' => Unit::Lt,
                '>' => Unit::Gt,
                other => Unit::Char(other),
            });
            rest = &rest[c.len_utf8()..];
        }
    }
}

/// Whether the first visible unit after a `<` would make a browser read a tag
fn starts_markup(rest: &[Unit<'_>]) -> bool {
    rest.iter()
        .find(|unit| !matches!(unit, Unit::Span(_)))
        .is_some_and(|unit| match unit {
            Unit::Char(next) => next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?'),
            _ => false,
        })
}

//! Code syntax highlighting using syntect.

use super::entities::normalize_code_entities;
use crate::text::escape_html;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "syntax-" };
const PLAIN_LANGUAGE: &str = "text";

/// Transformer for syntax highlighting code blocks
pub struct HighlightTransformer;

impl HighlightTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform events, replacing every code block with highlighted HTML
    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::with_capacity(events.len());
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code_lang = Some(match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => PLAIN_LANGUAGE.to_string(),
                    });
                    code_content.clear();
                }
                Event::Text(text) if code_lang.is_some() => {
                    code_content.push_str(text.as_ref());
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_lang.take().unwrap_or_else(|| PLAIN_LANGUAGE.to_string());
                    let html = self.render_block(&code_content, &lang);
                    result.push(Event::Html(CowStr::Boxed(html.into_boxed_str())));
                }
                other => result.push(other),
            }
        }

        result
    }

    /// Wrap highlighted (or plain) code in the standard code-block markup
    pub fn render_block(&self, code: &str, lang: &str) -> String {
        let class = escape_html(lang);
        let body = match find_syntax(lang) {
            Some(syntax) => match highlight_code(code, syntax) {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Highlighting failed for language '{}': {}", lang, e);
                    escape_html(code)
                }
            },
            None => {
                tracing::debug!("No syntax for language '{}', rendering plain code", lang);
                escape_html(code)
            }
        };

        format!(
            "<div class=\"code-block\"><pre class=\"language-{class}\"><code class=\"language-{class}\">{}</code></pre></div>\n",
            normalize_code_entities(&body)
        )
    }
}

impl Default for HighlightTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// First token of a fence info string ("rust,ignore" -> "rust")
fn fence_language(info: &str) -> String {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .find(|s| !s.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| PLAIN_LANGUAGE.to_string())
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    if lang == PLAIN_LANGUAGE {
        return None;
    }
    let ss = syntax_set();
    ss.find_syntax_by_token(lang)
        .or_else(|| ss.find_syntax_by_extension(lang))
}

fn highlight_code(code: &str, syntax: &SyntaxReference) -> Result<String, syntect::Error> {
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set(), CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

//! Feed parsing into the in-memory search index.

use super::{SearchDocument, SearchError};
use crate::text::{decode_entities, html_to_text};
use quick_xml::events::Event;
use quick_xml::Reader;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Category,
    Description,
    Content,
}

#[derive(Default)]
struct ItemFields {
    title: String,
    link: String,
    categories: Vec<String>,
    description: String,
    content: String,
}

impl ItemFields {
    fn into_document(self) -> SearchDocument {
        // content:encoded carries the full page body; description is the fallback
        let body = if self.content.trim().is_empty() {
            self.description
        } else {
            self.content
        };
        SearchDocument::new(
            self.link.trim(),
            self.title.trim(),
            html_to_text(&body),
            self.categories,
        )
    }
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"category" => Some(Field::Category),
        b"description" => Some(Field::Description),
        b"content:encoded" => Some(Field::Content),
        _ => None,
    }
}

/// Parse an RSS document into search documents, in feed order.
///
/// Item bodies go through [`html_to_text`], which drops `<img>` elements
/// before any other markup.
pub fn parse_feed(xml: &str) -> Result<Vec<SearchDocument>, SearchError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut documents = Vec::new();
    let mut item: Option<ItemFields> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"item" => item = Some(ItemFields::default()),
                name if item.is_some() => {
                    field = field_for(name);
                    text.clear();
                }
                _ => {}
            },
            Event::Text(e) if field.is_some() => {
                text.push_str(&decode_entities(&String::from_utf8_lossy(&e)));
            }
            Event::CData(e) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.name().as_ref() {
                b"item" => {
                    if let Some(fields) = item.take() {
                        documents.push(fields.into_document());
                    }
                    field = None;
                }
                name => {
                    if let (Some(current), Some(fields)) = (field, item.as_mut()) {
                        if field_for(name) == Some(current) {
                            let value = std::mem::take(&mut text);
                            match current {
                                Field::Title => fields.title = value,
                                Field::Link => fields.link = value,
                                Field::Category => {
                                    fields.categories.push(value.trim().to_string())
                                }
                                Field::Description => fields.description = value,
                                Field::Content => fields.content = value,
                            }
                            field = None;
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!("Parsed {} search documents from feed", documents.len());
    Ok(documents)
}

//! Syndication feed parser
//!
//! Reads `item` elements from RSS 2.0 and RSS 1.0 (RDF) documents. Element
//! names are matched by local name, so namespaced variants (`rss:item`,
//! `dc:date`) are accepted. Only the first occurrence of each item field is
//! kept.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// One raw `item` entry, text exactly as found in the feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    PubDate,
    Category,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            b"pubDate" | b"date" => Some(Self::PubDate),
            b"category" => Some(Self::Category),
            _ => None,
        }
    }
}

impl FeedItem {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::PubDate => &mut self.pub_date,
            Field::Category => &mut self.category,
        }
    }

    /// Stores `value` unless the field was already seen or the value is blank
    fn set_first(&mut self, field: Field, value: String) {
        let slot = self.slot(field);
        let value = value.trim();
        if slot.is_none() && !value.is_empty() {
            *slot = Some(value.to_string());
        }
    }
}

/// Parses the items of a feed document, in document order
///
/// # Example
///
/// ```
/// use newsweep::crawler::parse_feed;
///
/// let xml = r#"<rss><channel><item><title>Hi</title><link>https://a.example/1</link></item></channel></rss>"#;
/// let items = parse_feed(xml).unwrap();
/// assert_eq!(items[0].title.as_deref(), Some("Hi"));
/// ```
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, String> {
    let mut reader = Reader::from_str(xml);

    let mut saw_channel = false;
    let mut depth = 0usize;
    // Depth of the open `item` element and what has been read from it
    let mut current: Option<(usize, FeedItem)> = None;
    // Field being read and its accumulated text
    let mut field: Option<(Field, String)> = None;
    let mut items = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                let name = local.as_ref();

                if name == b"channel" {
                    saw_channel = true;
                }

                match open_item_depth(&current) {
                    Some(item_depth) => {
                        if depth == item_depth + 1 {
                            field = Field::from_local_name(name).map(|f| (f, String::new()));
                        }
                    }
                    None if name == b"item" => current = Some((depth, FeedItem::default())),
                    None => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let local = e.local_name();
                let name = local.as_ref();

                if name == b"channel" {
                    saw_channel = true;
                }

                // Atom-style <link href="..."/> inside an item
                if let Some((item_depth, item)) = &mut current {
                    if depth == *item_depth && name == b"link" {
                        if let Some(href) = href_attribute(&e) {
                            item.set_first(Field::Link, href);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = &mut field {
                    match t.unescape() {
                        Ok(value) => text.push_str(&value),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, text)) = &mut field {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                if let Some(item_depth) = open_item_depth(&current) {
                    if depth == item_depth + 1 {
                        if let (Some((f, text)), Some((_, item))) = (field.take(), current.as_mut()) {
                            item.set_first(f, text);
                        }
                    } else if depth == item_depth {
                        if let Some((_, done)) = current.take() {
                            items.push(done);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    if !saw_channel {
        return Err("document has no channel element".to_string());
    }

    Ok(items)
}

fn open_item_depth(current: &Option<(usize, FeedItem)>) -> Option<usize> {
    current.as_ref().map(|(depth, _)| *depth)
}

fn href_attribute(element: &BytesStart<'_>) -> Option<String> {
    let attribute = element.try_get_attribute("href").ok().flatten()?;
    let value = attribute.unescape_value().ok()?;
    Some(value.into_owned())
}

/// Parses an item date: RFC 2822 (RSS), then RFC 3339 (Dublin Core)
pub fn parse_pub_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

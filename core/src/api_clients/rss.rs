//! RSS 2.0 / Atom feed fetching.
//!
//! Only the handful of fields the geopolitical feed needs are extracted:
//! title, summary, link, and publication date.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{ApiError, ApiResult, error_from_response};
use tracker_utils_string::collapse_whitespace;

/// Date label used when an entry carries no parseable date.
pub const UNKNOWN_DATE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub published: Option<DateTime<FixedOffset>>,
}

impl FeedEntry {
    /// `YYYY-MM-DD`, or `N/A` when the entry was undated.
    pub fn date_label(&self) -> String {
        self.published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string())
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch `url` and return at most `limit` entries, in feed order.
    async fn fetch(&self, url: &str, limit: usize) -> ApiResult<Vec<FeedEntry>>;
}

pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str, limit: usize) -> ApiResult<Vec<FeedEntry>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await?;
        parse_feed(&body, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Summary,
    Link,
    Date,
    Other,
}

fn field_for(name: &[u8]) -> Field {
    match name {
        b"title" => Field::Title,
        b"description" | b"summary" | b"content" => Field::Summary,
        b"link" => Field::Link,
        b"pubDate" | b"published" | b"updated" | b"dc:date" => Field::Date,
        _ => Field::Other,
    }
}

fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
}

fn href_of(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"href")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// HTML named entities that news feeds use without declaring them.
fn html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => " ",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "eacute" => "\u{e9}",
        "uuml" => "\u{fc}",
        "ouml" => "\u{f6}",
        "auml" => "\u{e4}",
        _ => return None,
    })
}

/// Strip tags from an HTML fragment and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

#[derive(Default)]
struct EntryBuilder {
    entry: FeedEntry,
    date_raw: String,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Title => self.entry.title.push_str(text),
            Field::Summary => {
                // Atom feeds may carry both <summary> and <content>; first wins.
                if self.entry.summary.is_empty() {
                    self.entry.summary = strip_html(text);
                }
            }
            Field::Link => self.entry.link.push_str(text.trim()),
            Field::Date => {
                if self.date_raw.is_empty() {
                    self.date_raw = text.to_string();
                }
            }
            Field::Other => {}
        }
    }

    fn finish(mut self) -> FeedEntry {
        self.entry.title = collapse_whitespace(&self.entry.title);
        self.entry.published = parse_date(&self.date_raw);
        self.entry
    }
}

/// Parse an RSS 2.0 or Atom document, returning at most `limit` entries.
pub fn parse_feed(xml: &str, limit: usize) -> ApiResult<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut field = Field::Other;

    while entries.len() < limit {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match name.as_ref() {
                    b"item" | b"entry" => {
                        current = Some(EntryBuilder::default());
                        field = Field::Other;
                    }
                    other if current.is_some() => {
                        field = field_for(other);
                        if field == Field::Link
                            && let (Some(builder), Some(href)) = (current.as_mut(), href_of(&e))
                        {
                            builder.push_text(Field::Link, &href);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                // Atom: <link rel="alternate" href="..."/>
                if let Some(builder) = current.as_mut()
                    && e.name().as_ref() == b"link"
                    && builder.entry.link.is_empty()
                    && let Some(href) = href_of(&e)
                {
                    builder.push_text(Field::Link, &href);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(builder) = current.as_mut() {
                    let text = match e.unescape_with(html_entity) {
                        Ok(text) => text.into_owned(),
                        Err(err) => {
                            tracing::debug!("keeping raw feed text: {err}");
                            String::from_utf8_lossy(&e).into_owned()
                        }
                    };
                    builder.push_text(field, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(builder) = current.as_mut() {
                    let raw = e.into_inner();
                    builder.push_text(field, &String::from_utf8_lossy(&raw));
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" | b"entry" => {
                    if let Some(builder) = current.take() {
                        entries.push(builder.finish());
                    }
                    field = Field::Other;
                }
                _ => field = Field::Other,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ApiError::Feed(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}

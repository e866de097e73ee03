//! Field extraction from parsed feed entries.
//!
//! RSS, Atom and Media RSS put the same information in different places.
//! Each field is read through an ordered chain of extractors; the first one
//! that yields a non-blank value wins.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Feed};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A parsed entry plus the RSS `<enclosure>` URLs its item declared.
///
/// The parser files enclosures under media content, so they are recovered
/// from the document to keep them in their own step of the image chain.
#[derive(Debug, Clone, Copy)]
pub struct FeedItem<'a> {
    pub entry: &'a Entry,
    pub enclosures: &'a [String],
}

impl<'a> FeedItem<'a> {
    /// An entry with no RSS enclosures (Atom, or tests).
    pub fn new(entry: &'a Entry) -> Self {
        Self {
            entry,
            enclosures: &[],
        }
    }

    /// Pair an entry with its enclosure URLs.
    pub fn with_enclosures(entry: &'a Entry, enclosures: &'a [String]) -> Self {
        Self { entry, enclosures }
    }
}

/// One way of reading a text field from an item.
pub type Extractor = fn(&FeedItem<'_>) -> Option<String>;

/// Image URL sources, in priority order: media content, thumbnails, enclosures.
pub const IMAGE_EXTRACTORS: &[Extractor] = &[media_content_url, media_thumbnail_url, enclosure_url];

/// Author sources: declared authors, then contributors (where feed parsers
/// place alternate creator fields).
pub const AUTHOR_EXTRACTORS: &[Extractor] = &[author_name, contributor_name];

/// Description sources: summary, then full content body.
pub const DESCRIPTION_EXTRACTORS: &[Extractor] = &[summary_text, content_body];

/// Label used when a feed has neither a title nor a parseable host.
pub const SOURCE_FALLBACK: &str = "RSS Feed";

/// Run extractors in order, returning the first non-blank value.
pub fn first_match(item: &FeedItem<'_>, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|extract| non_blank(extract(item)))
}

/// Fields pulled from one entry, before identity and stamping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub title: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Extract every article field from an item.
pub fn extract_entry(item: &FeedItem<'_>, max_description_length: usize) -> EntryFields {
    let entry = item.entry;
    EntryFields {
        title: non_blank(entry.title.as_ref().map(|t| t.content.clone())),
        url: article_link(entry),
        // Explicit publication time first, last update as fallback.
        published_at: entry.published.or(entry.updated),
        author: first_match(item, AUTHOR_EXTRACTORS),
        description: first_match(item, DESCRIPTION_EXTRACTORS)
            .map(|d| truncate_chars(&d, max_description_length)),
        image_url: first_match(item, IMAGE_EXTRACTORS),
    }
}

/// The article's own link: the first alternate (or rel-less) link, else the
/// first link of any kind.
pub fn article_link(entry: &Entry) -> Option<String> {
    entry
        .links
        .iter()
        .filter(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .find_map(|l| non_blank(Some(l.href.clone())))
        .or_else(|| {
            entry
                .links
                .iter()
                .find_map(|l| non_blank(Some(l.href.clone())))
        })
}

/// Enclosure URLs of every RSS `<item>`, in document order.
///
/// Entries of an RSS feed come out of the parser in the same order, so the
/// result lines up with `Feed::entries` by index. Scanning stops at the first
/// XML error; items not reached have no enclosures.
pub fn rss_enclosures(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut reader = Reader::from_reader(bytes);
    let mut items = Vec::new();
    let mut current: Option<Vec<String>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"item" => {
                current = Some(Vec::new());
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"item" => {
                items.push(Vec::new());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"item" => {
                items.push(current.take().unwrap_or_default());
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"enclosure" =>
            {
                let url = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"url")
                    .and_then(|a| non_blank(Some(attribute_text(&a.value))));
                if let (Some(urls), Some(url)) = (current.as_mut(), url) {
                    urls.push(canonical_url(url.trim()));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    items
}

/// Display name for a feed: its title, else the URL host, else a generic label.
pub fn source_name(feed: &Feed, feed_url: &str) -> String {
    non_blank(feed.title.as_ref().map(|t| t.content.clone()))
        .or_else(|| {
            url::Url::parse(feed_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| SOURCE_FALLBACK.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn attribute_text(value: &[u8]) -> String {
    let raw = String::from_utf8_lossy(value);
    quick_xml::escape::unescape(&raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

// Same serialization the parser applies to media URLs.
fn canonical_url(raw: &str) -> String {
    url::Url::parse(raw)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn media_content_url(item: &FeedItem<'_>) -> Option<String> {
    item.entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|c| c.url.as_ref().map(|u| u.to_string()))
        .filter(|u| !item.enclosures.contains(u))
        .find_map(|u| non_blank(Some(u)))
}

fn media_thumbnail_url(item: &FeedItem<'_>) -> Option<String> {
    item.entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .find_map(|t| non_blank(Some(t.image.uri.clone())))
}

fn enclosure_url(item: &FeedItem<'_>) -> Option<String> {
    item.entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| l.href.clone())
        .chain(item.enclosures.iter().cloned())
        .find_map(|u| non_blank(Some(u)))
}

fn author_name(item: &FeedItem<'_>) -> Option<String> {
    item.entry
        .authors
        .iter()
        .find_map(|p| non_blank(Some(p.name.clone())))
}

fn contributor_name(item: &FeedItem<'_>) -> Option<String> {
    item.entry
        .contributors
        .iter()
        .find_map(|p| non_blank(Some(p.name.clone())))
}

fn summary_text(item: &FeedItem<'_>) -> Option<String> {
    item.entry.summary.as_ref().map(|t| t.content.clone())
}

fn content_body(item: &FeedItem<'_>) -> Option<String> {
    item.entry.content.as_ref().and_then(|c| c.body.clone())
}

//! Feed retrieval and field extraction.

pub mod client;
pub mod extract;
pub mod fetcher;

pub use client::{validate_url, FeedClient, HttpFeedClient};
pub use extract::{extract_entry, rss_enclosures, EntryFields, FeedItem, SOURCE_FALLBACK};
pub use fetcher::{parse_source, FeedFetcher};

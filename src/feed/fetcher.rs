//! Feed fetching with per-source fault isolation.
//!
//! A source that cannot be retrieved, parsed, or answered within the source
//! timeout contributes zero records; it never aborts the cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::client::{FeedClient, HttpFeedClient};
use super::extract::{extract_entry, rss_enclosures, source_name, FeedItem};
use crate::article::{generate_id, normalize_and_dedupe, ArticleCollection, RawArticle};
use crate::config::FetchConfig;
use crate::datetime::{format_utc, now_utc};
use crate::error::{FeedmergeError, Result};

/// Fetches and extracts articles from configured sources.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Arc<dyn FeedClient>,
    source_timeout: Duration,
    max_description_length: usize,
}

impl FeedFetcher {
    /// Create a fetcher over an arbitrary client.
    pub fn new(client: Arc<dyn FeedClient>, config: &FetchConfig) -> Self {
        Self {
            client,
            source_timeout: Duration::from_secs(config.total_timeout_secs),
            max_description_length: config.max_description_length,
        }
    }

    /// Create a fetcher using the HTTP client.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = HttpFeedClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Override the per-source timeout.
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Fetch one source, returning an empty list on any failure.
    pub async fn fetch_source(&self, source_url: &str) -> Vec<RawArticle> {
        match tokio::time::timeout(self.source_timeout, self.try_fetch_source(source_url)).await {
            Ok(Ok(records)) => {
                debug!("Fetched {} record(s) from {}", records.len(), source_url);
                records
            }
            Ok(Err(e)) => {
                warn!("Failed to fetch feed {}: {}", source_url, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Feed {} timed out after {} seconds",
                    source_url,
                    self.source_timeout.as_secs()
                );
                Vec::new()
            }
        }
    }

    /// Fetch one source, propagating failures.
    pub async fn try_fetch_source(&self, source_url: &str) -> Result<Vec<RawArticle>> {
        let bytes = self.client.get(source_url).await?;
        parse_source(&bytes, source_url, now_utc(), self.max_description_length)
    }

    /// Fetch every source and combine the results.
    ///
    /// Sources are fetched concurrently, but results are concatenated in
    /// source-list order, so when two sources carry the same article the
    /// earlier source's copy survives deduplication.
    pub async fn fetch_all(&self, sources: &[String]) -> ArticleCollection {
        let per_source = join_all(sources.iter().map(|url| async move {
            normalize_and_dedupe(self.fetch_source(url).await)
        }))
        .await;

        let records: Vec<RawArticle> = per_source
            .iter()
            .flat_map(|collection| collection.iter().map(RawArticle::from))
            .collect();
        let combined = normalize_and_dedupe(records);

        info!(
            "Fetched {} article(s) from {} source(s)",
            combined.len(),
            sources.len()
        );
        combined
    }
}

/// Parse a feed document into stamped records.
pub fn parse_source(
    bytes: &[u8],
    source_url: &str,
    fetched_at: DateTime<Utc>,
    max_description_length: usize,
) -> Result<Vec<RawArticle>> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedmergeError::Parse(format!("failed to parse feed: {}", e)))?;

    let source = source_name(&feed, source_url);
    let fetched_at = format_utc(&fetched_at);
    let enclosures = rss_enclosures(bytes);

    let records = feed
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let item = FeedItem::with_enclosures(
                entry,
                enclosures.get(i).map(Vec::as_slice).unwrap_or_default(),
            );
            let fields = extract_entry(&item, max_description_length);
            RawArticle {
                id: Some(generate_id(fields.url.as_deref())),
                title: fields.title,
                published_at: fields.published_at.as_ref().map(format_utc),
                author: fields.author,
                description: fields.description,
                url: fields.url,
                image_url: fields.image_url,
                source_name: Some(source.clone()),
                source_feed_url: Some(source_url.to_string()),
                fetched_at: Some(fetched_at.clone()),
            }
        })
        .collect();

    Ok(records)
}

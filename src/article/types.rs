//! Article types for feedmerge.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::format_utc;

/// Column names of the snapshot, in order.
pub const SNAPSHOT_COLUMNS: [&str; 10] = [
    "article_id",
    "title",
    "published_time_utc",
    "author",
    "description",
    "url",
    "image_url",
    "source_name",
    "source_feed_url",
    "fetched_at_utc",
];

/// A loosely typed article record.
///
/// This is what the fetcher emits and what a snapshot row decodes into.
/// Any field may be missing; [`crate::article::normalize_and_dedupe`] turns
/// these into [`Article`]s. Field order matches [`SNAPSHOT_COLUMNS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArticle {
    #[serde(rename = "article_id")]
    pub id: Option<String>,
    pub title: Option<String>,
    /// Publication time as text; parsed during normalization.
    #[serde(rename = "published_time_utc")]
    pub published_at: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub source_name: Option<String>,
    pub source_feed_url: Option<String>,
    #[serde(rename = "fetched_at_utc")]
    pub fetched_at: Option<String>,
}

/// A normalized article.
///
/// Text fields are never absent; a missing value is the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Stable identifier (see [`crate::article::generate_id`]).
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Display name of the feed the article came from.
    pub source_name: String,
    pub source_feed_url: String,
    pub url: String,
    pub image_url: String,
    /// Publication time, when the feed provides one.
    pub published_at: Option<DateTime<Utc>>,
    /// When the article was first observed.
    pub fetched_at: DateTime<Utc>,
}

impl From<&Article> for RawArticle {
    fn from(article: &Article) -> Self {
        RawArticle {
            id: Some(article.id.clone()),
            title: Some(article.title.clone()),
            published_at: article.published_at.as_ref().map(format_utc),
            author: Some(article.author.clone()),
            description: Some(article.description.clone()),
            url: Some(article.url.clone()),
            image_url: Some(article.image_url.clone()),
            source_name: Some(article.source_name.clone()),
            source_feed_url: Some(article.source_feed_url.clone()),
            fetched_at: Some(format_utc(&article.fetched_at)),
        }
    }
}

/// The deduplicated, newest-first set of known articles.
///
/// Can only be built through normalization, so ids are always unique and
/// the ordering invariant always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleCollection {
    articles: Vec<Article>,
}

impl ArticleCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from articles, backfilling blank ids, dropping
    /// later duplicates and sorting newest first.
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: super::normalize::dedupe_and_sort(articles),
        }
    }

    /// Re-run normalization over this collection.
    pub fn renormalized(&self) -> Self {
        Self::from_articles(self.articles.clone())
    }

    /// Number of articles.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Check if the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Articles in collection order.
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Iterate articles in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.articles.iter()
    }

    /// Look up an article by id.
    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// Check whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Set of all ids.
    pub fn ids(&self) -> HashSet<String> {
        self.articles.iter().map(|a| a.id.clone()).collect()
    }

    /// Articles whose id is in `ids`, in collection order.
    pub fn select(&self, ids: &HashSet<String>) -> Vec<Article> {
        self.articles
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect()
    }

    /// Consume the collection, returning its articles.
    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

impl<'a> IntoIterator for &'a ArticleCollection {
    type Item = &'a Article;
    type IntoIter = std::slice::Iter<'a, Article>;

    fn into_iter(self) -> Self::IntoIter {
        self.articles.iter()
    }
}

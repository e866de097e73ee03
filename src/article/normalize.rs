//! Normalization and deduplication of article records.
//!
//! This is the one place where loose records become [`Article`]s: absent
//! text becomes the empty string, blank ids are backfilled, timestamps are
//! parsed to UTC at second precision, duplicates are dropped (first one
//! wins) and the result is sorted newest first.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::identity::generate_id;
use super::types::{Article, ArticleCollection, RawArticle};
use crate::datetime::{now_utc, parse_utc, truncate_to_seconds};

/// Default substitution for optional text: absent becomes `""`.
pub fn text_or_empty(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// Convert one loose record into an [`Article`].
///
/// `observed_at` stands in for a missing or malformed fetch time.
pub fn normalize_record(raw: RawArticle, observed_at: DateTime<Utc>) -> Article {
    let url = text_or_empty(raw.url);
    let id = text_or_empty(raw.id);
    let id = if id.trim().is_empty() {
        generate_id(Some(&url))
    } else {
        id
    };

    let published_at = raw
        .published_at
        .as_deref()
        .and_then(parse_utc)
        .map(truncate_to_seconds);
    let fetched_at = raw
        .fetched_at
        .as_deref()
        .and_then(parse_utc)
        .map(truncate_to_seconds)
        .unwrap_or(observed_at);

    Article {
        id,
        title: text_or_empty(raw.title),
        author: text_or_empty(raw.author),
        description: text_or_empty(raw.description),
        source_name: text_or_empty(raw.source_name),
        source_feed_url: text_or_empty(raw.source_feed_url),
        url,
        image_url: text_or_empty(raw.image_url),
        published_at,
        fetched_at,
    }
}

/// Normalize loose records into a clean collection.
pub fn normalize_and_dedupe(records: Vec<RawArticle>) -> ArticleCollection {
    let observed_at = now_utc();
    let articles = records
        .into_iter()
        .map(|raw| normalize_record(raw, observed_at))
        .collect();
    ArticleCollection::from_articles(articles)
}

/// Backfill blank ids, keep the first article per id, sort newest first.
pub(crate) fn dedupe_and_sort(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::with_capacity(articles.len());
    let mut unique: Vec<Article> = articles
        .into_iter()
        .map(|mut article| {
            if article.id.trim().is_empty() {
                article.id = generate_id(Some(&article.url));
            }
            article
        })
        .filter(|article| seen.insert(article.id.clone()))
        .collect();

    sort_newest_first(&mut unique);
    unique
}

/// Stable sort by publication time, newest first, undated articles last.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| compare_published_desc(a.published_at, b.published_at));
}

fn compare_published_desc(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

//! Test helpers for integration tests.
//!
//! Provides a scripted feed client, durable stores with controllable
//! behavior, and builders for feed documents and pipelines.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use feedmerge::config::FetchConfig;
use feedmerge::{
    Article, ArticleStore, FeedClient, FeedFetcher, FeedmergeError, Persister, Pipeline, Result,
    SnapshotFile,
};

/// Feed client that serves scripted documents by URL.
///
/// URLs with no document fail like an unreachable host.
#[derive(Default)]
pub struct ScriptedClient {
    documents: Mutex<HashMap<String, String>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `body` at `url` from now on.
    pub fn serve(&self, url: &str, body: String) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), body);
    }

    /// Make `url` unreachable.
    pub fn fail(&self, url: &str) {
        self.documents.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl FeedClient for ScriptedClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.documents
            .lock()
            .unwrap()
            .get(url)
            .map(|body| body.clone().into_bytes())
            .ok_or_else(|| FeedmergeError::Fetch(format!("connection refused: {url}")))
    }
}

/// Durable store that records upserts and can be switched off.
#[derive(Default)]
pub struct SwitchableStore {
    down: AtomicBool,
    rows: Mutex<HashMap<String, Article>>,
    batches: Mutex<Vec<usize>>,
}

impl SwitchableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn row(&self, id: &str) -> Option<Article> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArticleStore for SwitchableStore {
    async fn upsert(&self, articles: &[Article]) -> Result<usize> {
        if self.down.load(Ordering::SeqCst) {
            return Err(FeedmergeError::Database(
                "could not connect to server".to_string(),
            ));
        }
        let mut rows = self.rows.lock().unwrap();
        for article in articles {
            rows.insert(article.id.clone(), article.clone());
        }
        self.batches.lock().unwrap().push(articles.len());
        Ok(articles.len())
    }
}

/// One RSS item: link, title, day of January 2024 (or undated).
pub struct Item<'a> {
    pub link: &'a str,
    pub title: &'a str,
    pub day: Option<u32>,
}

pub fn item<'a>(link: &'a str, title: &'a str, day: u32) -> Item<'a> {
    Item {
        link,
        title,
        day: Some(day),
    }
}

/// Render an RSS 2.0 document.
pub fn rss(channel_title: &str, items: &[Item<'_>]) -> String {
    let items: String = items
        .iter()
        .map(|item| {
            let date = item
                .day
                .map(|d| format!("<pubDate>{d:02} Jan 2024 09:00:00 GMT</pubDate>"))
                .unwrap_or_default();
            format!(
                "<item><title>{}</title><link>{}</link>{}</item>",
                item.title, item.link, date
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>{channel_title}</title>{items}</channel></rss>"#
    )
}

/// Build a pipeline over scripted sources with its snapshot in `dir`.
pub fn pipeline(
    dir: &Path,
    sources: &[&str],
    client: Arc<ScriptedClient>,
    store: Option<Arc<SwitchableStore>>,
) -> Pipeline {
    let fetcher = FeedFetcher::new(client, &FetchConfig::default());
    let durable = store.map(|s| s as Arc<dyn ArticleStore>);
    let persister = Persister::new(SnapshotFile::new(dir.join("articles.csv")), durable);
    Pipeline::new(
        sources.iter().map(|s| s.to_string()).collect(),
        fetcher,
        persister,
    )
}

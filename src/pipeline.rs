//! One merge cycle: fetch, merge, persist.
//!
//! [`Pipeline`] is the single owner of the current collection. Readers get
//! an `Arc` to an immutable collection that is swapped only after the
//! snapshot has been written.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::article::{merge, ArticleCollection};
use crate::config::Config;
use crate::datetime::{format_utc, now_utc};
use crate::feed::{FeedClient, FeedFetcher, HttpFeedClient};
use crate::media::MediaPrefetcher;
use crate::poller::PollState;
use crate::store::{ArticleStore, Persister, SnapshotFile};
use crate::Result;

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Ids added by this cycle.
    pub new_ids: HashSet<String>,
    /// Size of the collection after the cycle.
    pub total: usize,
    /// When the cycle finished.
    pub completed_at: DateTime<Utc>,
    /// Articles written to the durable store.
    pub upserted: usize,
    /// Durable store failure, if any. The cycle still counts as successful.
    pub durable_warning: Option<String>,
}

impl CycleReport {
    /// Number of articles added by this cycle.
    pub fn new_count(&self) -> usize {
        self.new_ids.len()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.new_ids.is_empty() {
            write!(f, "No new items. Total: {}", self.total)?;
        } else {
            write!(
                f,
                "Added {} new item(s). Total: {}",
                self.new_count(),
                self.total
            )?;
        }
        if let Some(warning) = &self.durable_warning {
            write!(f, " | DB upsert error: {}", warning)?;
        }
        Ok(())
    }
}

/// Fetch, merge and persist over a fixed list of sources.
pub struct Pipeline {
    sources: Vec<String>,
    fetcher: FeedFetcher,
    persister: Persister,
    media: Option<MediaPrefetcher>,
    collection: Arc<ArticleCollection>,
}

impl Pipeline {
    /// Create a pipeline with an empty collection.
    pub fn new(sources: Vec<String>, fetcher: FeedFetcher, persister: Persister) -> Self {
        Self {
            sources,
            fetcher,
            persister,
            media: None,
            collection: Arc::new(ArticleCollection::new()),
        }
    }

    /// Build a pipeline from configuration, using HTTP for feeds and images.
    pub fn from_config(
        config: &Config,
        sources: Vec<String>,
        durable: Option<Arc<dyn ArticleStore>>,
    ) -> Result<Self> {
        let client: Arc<dyn FeedClient> = Arc::new(HttpFeedClient::new(&config.fetch)?);
        let fetcher = FeedFetcher::new(client.clone(), &config.fetch);
        let persister = Persister::new(SnapshotFile::new(&config.snapshot.path), durable);

        let mut pipeline = Self::new(sources, fetcher, persister);
        if config.media.enabled {
            pipeline = pipeline.with_media(MediaPrefetcher::new(client, &config.media));
        }
        Ok(pipeline)
    }

    /// Prefetch images of new articles after each cycle.
    pub fn with_media(mut self, media: MediaPrefetcher) -> Self {
        self.media = Some(media);
        self
    }

    /// Start from an existing collection instead of an empty one.
    pub fn with_collection(mut self, collection: ArticleCollection) -> Self {
        self.collection = Arc::new(collection);
        self
    }

    /// Replace the current collection with what the snapshot holds.
    pub async fn restore(&mut self) -> usize {
        let collection = self.persister.snapshot().load().await;
        let count = collection.len();
        self.collection = Arc::new(collection);
        count
    }

    /// The current collection.
    pub fn collection(&self) -> Arc<ArticleCollection> {
        Arc::clone(&self.collection)
    }

    /// Configured sources, in priority order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Replace the source list. Takes effect on the next cycle.
    pub fn set_sources(&mut self, sources: Vec<String>) {
        self.sources = sources;
    }

    /// Run one full cycle.
    ///
    /// `on_state` is told about each phase as it starts. If the snapshot
    /// cannot be written the cycle fails and the collection is unchanged.
    pub async fn run_cycle<F>(&mut self, mut on_state: F) -> Result<CycleReport>
    where
        F: FnMut(PollState) + Send,
    {
        on_state(PollState::Fetching);
        let fresh = self.fetcher.fetch_all(&self.sources).await;

        on_state(PollState::Merging);
        let outcome = merge(&self.collection, &fresh);
        debug!(
            "Merged {} fetched article(s): {} new",
            fresh.len(),
            outcome.new_ids.len()
        );

        on_state(PollState::Persisting);
        let persisted = self
            .persister
            .persist(&outcome.combined, &outcome.new_ids)
            .await?;
        self.collection = Arc::new(outcome.combined);

        if let Some(media) = &self.media {
            if !outcome.new_ids.is_empty() {
                media.prefetch(&self.collection, &outcome.new_ids).await;
            }
        }

        let report = CycleReport {
            new_ids: outcome.new_ids,
            total: self.collection.len(),
            completed_at: now_utc(),
            upserted: persisted.upserted,
            durable_warning: persisted.durable_warning,
        };
        info!("{} (at {})", report, format_utc(&report.completed_at));
        Ok(report)
    }

    /// Upsert the whole current collection to the durable store.
    pub async fn upsert_all(&self) -> Result<usize> {
        info!(
            "Upserting all {} article(s) to durable store",
            self.collection.len()
        );
        self.persister.upsert(self.collection.articles()).await
    }

    /// Upsert the articles with the given ids, if present in the collection.
    pub async fn upsert_ids(&self, ids: &HashSet<String>) -> Result<usize> {
        let selected = self.collection.select(ids);
        debug!(
            "Upserting {} of {} requested article(s)",
            selected.len(),
            ids.len()
        );
        self.persister.upsert(&selected).await
    }
}

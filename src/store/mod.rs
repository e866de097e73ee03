//! Persistence: the local snapshot and the durable upsert store.
//!
//! The snapshot must succeed for a cycle to count. The durable store is
//! best effort: its failures become a warning on the outcome.

pub mod durable;
pub mod snapshot;

pub use durable::{ArticleStore, SqlArticleStore};
pub use snapshot::SnapshotFile;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::article::{Article, ArticleCollection};
use crate::Result;

/// What happened when a merge result was persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistOutcome {
    /// Articles written to the durable store.
    pub upserted: usize,
    /// Durable store failure, if any.
    pub durable_warning: Option<String>,
}

/// Writes merge results to both sinks.
#[derive(Clone)]
pub struct Persister {
    snapshot: SnapshotFile,
    durable: Option<Arc<dyn ArticleStore>>,
}

impl Persister {
    /// Create a persister. Without a durable store only the snapshot is written.
    pub fn new(snapshot: SnapshotFile, durable: Option<Arc<dyn ArticleStore>>) -> Self {
        Self { snapshot, durable }
    }

    /// The snapshot file.
    pub fn snapshot(&self) -> &SnapshotFile {
        &self.snapshot
    }

    /// Check whether a durable store is configured.
    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// Write the full collection to the snapshot, then upsert only the
    /// articles whose ids are in `new_ids`.
    ///
    /// Fails only if the snapshot cannot be written.
    pub async fn persist(
        &self,
        combined: &ArticleCollection,
        new_ids: &HashSet<String>,
    ) -> Result<PersistOutcome> {
        self.snapshot.write(combined).await?;

        if new_ids.is_empty() {
            return Ok(PersistOutcome::default());
        }
        Ok(self.upsert_best_effort(&combined.select(new_ids)).await)
    }

    /// Upsert articles, turning a failure into a warning.
    pub async fn upsert_best_effort(&self, articles: &[Article]) -> PersistOutcome {
        match self.upsert(articles).await {
            Ok(upserted) => PersistOutcome {
                upserted,
                durable_warning: None,
            },
            Err(e) => {
                warn!("Durable upsert of {} article(s) failed: {}", articles.len(), e);
                PersistOutcome {
                    upserted: 0,
                    durable_warning: Some(e.to_string()),
                }
            }
        }
    }

    /// Upsert articles to the durable store, if there is one.
    pub async fn upsert(&self, articles: &[Article]) -> Result<usize> {
        match &self.durable {
            Some(store) => store.upsert(articles).await,
            None => {
                debug!("No durable store configured, skipping upsert");
                Ok(0)
            }
        }
    }
}

//! Durable upsert store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::article::Article;
use crate::db::{ArticleRepository, Database};
use crate::Result;

/// A persistent store supporting idempotent upsert by article id.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert absent articles and overwrite present ones.
    ///
    /// Returns the number of articles written.
    async fn upsert(&self, articles: &[Article]) -> Result<usize>;
}

/// [`ArticleStore`] backed by the sqlx database.
pub struct SqlArticleStore {
    db: Database,
    batch_size: usize,
    schema_ready: AtomicBool,
}

impl SqlArticleStore {
    /// Create a store over an open database.
    pub fn new(db: Database, batch_size: usize) -> Self {
        Self {
            db,
            batch_size,
            schema_ready: AtomicBool::new(false),
        }
    }

    /// Get the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Make sure the schema exists, once per store.
    ///
    /// A failure leaves the flag unset so the next upsert tries again.
    pub async fn ensure_schema(&self) -> Result<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.db.ensure_schema().await?;
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for SqlArticleStore {
    async fn upsert(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            debug!("Nothing to upsert");
            return Ok(0);
        }

        self.ensure_schema().await?;

        let written = ArticleRepository::new(self.db.pool())
            .upsert(articles, self.batch_size)
            .await?;
        info!("Upserted {} article(s) to durable store", written);
        Ok(written)
    }
}

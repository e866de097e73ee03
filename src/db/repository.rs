//! Article repository for the durable store.

use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use super::{DbBackend, DbPool};
use crate::article::Article;
use crate::{FeedmergeError, Result};

/// Maximum stored title length in characters.
pub const MAX_TITLE_LENGTH: usize = 10000;

const INSERT_PREFIX: &str = "INSERT INTO rss_article (
    article_id, title, published_time, author, description,
    url, image_url, source_name, source_feed_url, fetched_at_utc
) ";

const ON_CONFLICT_UPDATE: &str = " ON CONFLICT (article_id) DO UPDATE SET
    title           = EXCLUDED.title,
    published_time  = EXCLUDED.published_time,
    author          = EXCLUDED.author,
    description     = EXCLUDED.description,
    url             = EXCLUDED.url,
    image_url       = EXCLUDED.image_url,
    source_name     = EXCLUDED.source_name,
    source_feed_url = EXCLUDED.source_feed_url,
    fetched_at_utc  = EXCLUDED.fetched_at_utc";

const SELECT_COLUMNS: &str = "SELECT article_id, title, published_time, author, description,
       url, image_url, source_name, source_feed_url, fetched_at_utc
FROM rss_article";

/// Row type for an article from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    article_id: String,
    title: String,
    published_time: Option<DateTime<Utc>>,
    author: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    source_name: Option<String>,
    source_feed_url: Option<String>,
    fetched_at_utc: DateTime<Utc>,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.article_id,
            title: row.title,
            author: row.author.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            source_name: row.source_name.unwrap_or_default(),
            source_feed_url: row.source_feed_url.unwrap_or_default(),
            url: row.url.unwrap_or_default(),
            image_url: row.image_url.unwrap_or_default(),
            published_at: row.published_time,
            fetched_at: row.fetched_at_utc,
        }
    }
}

/// Empty text is stored as NULL.
fn nullable(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LENGTH).collect()
}

/// Repository for article operations.
pub struct ArticleRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert or fully overwrite articles, keyed by id.
    ///
    /// Runs in one transaction, `batch_size` rows per statement. Returns the
    /// number of articles submitted.
    pub async fn upsert(&self, articles: &[Article], batch_size: usize) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        for chunk in articles.chunks(batch_size.max(1)) {
            let mut query: QueryBuilder<DbBackend> = QueryBuilder::new(INSERT_PREFIX);
            query.push_values(chunk, |mut row, article| {
                row.push_bind(article.id.clone())
                    .push_bind(truncate_title(&article.title))
                    .push_bind(article.published_at)
                    .push_bind(nullable(&article.author))
                    .push_bind(nullable(&article.description))
                    .push_bind(nullable(&article.url))
                    .push_bind(nullable(&article.image_url))
                    .push_bind(nullable(&article.source_name))
                    .push_bind(nullable(&article.source_feed_url))
                    .push_bind(article.fetched_at);
            });
            query.push(ON_CONFLICT_UPDATE);

            query
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| FeedmergeError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        Ok(articles.len())
    }

    /// Get an article by id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Article>> {
        let query = format!("{SELECT_COLUMNS} WHERE article_id = $1");
        let row = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        Ok(row.map(Article::from))
    }

    /// List the most recently published articles (undated ones last).
    pub async fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        let query = format!(
            "{SELECT_COLUMNS} ORDER BY published_time DESC NULLS LAST, fetched_at_utc DESC LIMIT $1"
        );
        let rows = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(limit as i64)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Find articles by URL.
    pub async fn find_by_url(&self, url: &str) -> Result<Vec<Article>> {
        let query = format!("{SELECT_COLUMNS} WHERE url = $1");
        let rows = sqlx::query_as::<_, ArticleRow>(&query)
            .bind(url)
            .fetch_all(self.pool)
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Count all stored articles.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rss_article")
            .fetch_one(self.pool)
            .await
            .map_err(|e| FeedmergeError::Database(e.to_string()))?;

        Ok(count)
    }
}

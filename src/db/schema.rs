//! Durable store schema.
//!
//! One relation keyed by `article_id`, with secondary indexes for the two
//! read paths consumers rely on: newest first, and lookup by URL. Each entry
//! is a single statement and safe to re-run.

/// Statements creating the article relation and its indexes.
#[cfg(feature = "sqlite")]
pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS rss_article (
    article_id      TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    published_time  TEXT,
    author          TEXT,
    description     TEXT,
    url             TEXT,
    image_url       TEXT,
    source_name     TEXT,
    source_feed_url TEXT,
    fetched_at_utc  TEXT NOT NULL
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_rss_article_published_time ON rss_article (published_time DESC)",
    "CREATE INDEX IF NOT EXISTS idx_rss_article_url ON rss_article (url)",
];

/// Statements creating the article relation and its indexes.
#[cfg(feature = "postgres")]
pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS rss_article (
    article_id      TEXT PRIMARY KEY,
    title           TEXT NOT NULL,
    published_time  TIMESTAMPTZ,
    author          TEXT,
    description     TEXT,
    url             TEXT,
    image_url       TEXT,
    source_name     TEXT,
    source_feed_url TEXT,
    fetched_at_utc  TIMESTAMPTZ NOT NULL
)
"#,
    "CREATE INDEX IF NOT EXISTS idx_rss_article_published_time ON rss_article (published_time DESC)",
    "CREATE INDEX IF NOT EXISTS idx_rss_article_url ON rss_article (url)",
];

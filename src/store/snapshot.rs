//! Local snapshot file.
//!
//! The full collection as CSV with a fixed header. Writes go to a temporary
//! sibling file that is then renamed over the snapshot, so a reader sees
//! either the old file or the new one.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::article::{normalize_and_dedupe, ArticleCollection, RawArticle, SNAPSHOT_COLUMNS};
use crate::{FeedmergeError, Result};

/// The on-disk snapshot of the collection.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Create a handle for the snapshot at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, normalizing what was read.
    ///
    /// A missing or unreadable snapshot is an empty collection. If cleaning
    /// drops rows the file is rewritten right away.
    pub async fn load(&self) -> ArticleCollection {
        let records = match self.read_records().await {
            Ok(Some(records)) => records,
            Ok(None) => {
                debug!("No snapshot at {}", self.path.display());
                return ArticleCollection::new();
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable snapshot {}: {}",
                    self.path.display(),
                    e
                );
                return ArticleCollection::new();
            }
        };

        let row_count = records.len();
        let collection = normalize_and_dedupe(records);

        if collection.len() != row_count {
            info!(
                "Snapshot cleaned from {} to {} row(s), rewriting",
                row_count,
                collection.len()
            );
            if let Err(e) = self.write(&collection).await {
                warn!("Failed to rewrite cleaned snapshot: {}", e);
            }
        }

        info!(
            "Loaded {} article(s) from {}",
            collection.len(),
            self.path.display()
        );
        collection
    }

    /// Read raw rows, or `None` if the file does not exist.
    pub async fn read_records(&self) -> Result<Option<Vec<RawArticle>>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        decode(&bytes).map(Some)
    }

    /// Replace the snapshot with `collection`.
    pub async fn write(&self, collection: &ArticleCollection) -> Result<()> {
        let bytes = encode(collection)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            "Wrote {} article(s) to {}",
            collection.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Serialize a collection to CSV bytes with the snapshot header.
pub fn encode(collection: &ArticleCollection) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(SNAPSHOT_COLUMNS)?;
    for article in collection {
        writer.serialize(RawArticle::from(article))?;
    }
    writer
        .into_inner()
        .map_err(|e| FeedmergeError::Snapshot(e.to_string()))
}

/// Parse CSV bytes into loose records.
///
/// Columns are matched by header name; unknown columns are ignored and
/// missing ones are left empty.
pub fn decode(bytes: &[u8]) -> Result<Vec<RawArticle>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);
    reader
        .deserialize::<RawArticle>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(FeedmergeError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{generate_id, Article};
    use chrono::{TimeZone, Utc};

    fn article(url: &str, title: &str, day: Option<u32>) -> Article {
        Article {
            id: generate_id(Some(url)),
            title: title.to_string(),
            author: "Reporter".to_string(),
            description: "Line one, with comma\nline two".to_string(),
            source_name: "Example".to_string(),
            source_feed_url: "https://example.com/feed.xml".to_string(),
            url: url.to_string(),
            image_url: String::new(),
            published_at: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 8, 30, 0).unwrap()),
            fetched_at: Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("data").join("articles.csv"));

        let collection = ArticleCollection::from_articles(vec![
            article("https://example.com/a", "A", Some(1)),
            article("https://example.com/b", "B", None),
        ]);
        snapshot.write(&collection).await.unwrap();

        assert_eq!(snapshot.load().await, collection);
        assert!(!snapshot.temp_path().exists());
    }

    #[tokio::test]
    async fn test_header_and_timestamp_format() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("articles.csv"));

        let collection =
            ArticleCollection::from_articles(vec![article("https://example.com/a", "A", Some(3))]);
        snapshot.write(&collection).await.unwrap();

        let text = std::fs::read_to_string(snapshot.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("article_id,title,published_time_utc,author,description,url,image_url,source_name,source_feed_url,fetched_at_utc")
        );
        assert!(text.contains("2024-01-03T08:30:00Z"));
        assert!(text.contains("2024-02-01T12:00:00Z"));
    }

    #[tokio::test]
    async fn test_empty_collection_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("articles.csv"));

        snapshot.write(&ArticleCollection::new()).await.unwrap();

        let text = std::fs::read_to_string(snapshot.path()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(snapshot.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("missing.csv"));
        assert!(snapshot.load().await.is_empty());
        assert!(!snapshot.path().exists());
    }

    #[tokio::test]
    async fn test_load_corrupt_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.csv");
        std::fs::write(&path, b"article_id,title\nabc,\xff\xfe\n").unwrap();

        assert!(SnapshotFile::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_rewrites_when_rows_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.csv");
        let id = generate_id(Some("https://example.com/a"));
        std::fs::write(
            &path,
            format!(
                "article_id,title,published_time_utc,url\n\
                 {id},First,2024-01-01T00:00:00Z,https://example.com/a\n\
                 {id},Duplicate,2024-01-02T00:00:00Z,https://example.com/a\n"
            ),
        )
        .unwrap();

        let snapshot = SnapshotFile::new(&path);
        let loaded = snapshot.load().await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.articles()[0].title, "First");

        let rows = snapshot.read_records().await.unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn test_load_backfills_missing_ids_without_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.csv");
        let original = "title,url\nNo id,https://example.com/x\n";
        std::fs::write(&path, original).unwrap();

        let loaded = SnapshotFile::new(&path).load().await;

        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.articles()[0].id,
            generate_id(Some("https://example.com/x"))
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_decode_ignores_unknown_columns() {
        let rows = decode(b"article_id,extra,title\nabc,zzz,Hello\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.as_deref(), Some("abc"));
        assert_eq!(rows[0].title.as_deref(), Some("Hello"));
        assert_eq!(rows[0].url, None);
    }
}

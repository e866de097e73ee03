//! Image prefetch for newly seen articles.
//!
//! Images are saved as `<dir>/<article id><ext>`. A file that already exists
//! is never downloaded again. Failures are logged and otherwise ignored.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::article::ArticleCollection;
use crate::config::MediaConfig;
use crate::feed::FeedClient;
use crate::{FeedmergeError, Result};

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
const DEFAULT_EXTENSION: &str = ".jpg";

/// Downloads article images into a local directory.
#[derive(Clone)]
pub struct MediaPrefetcher {
    client: Arc<dyn FeedClient>,
    dir: PathBuf,
    timeout: Duration,
}

impl MediaPrefetcher {
    /// Create a prefetcher writing into `config.dir`.
    pub fn new(client: Arc<dyn FeedClient>, config: &MediaConfig) -> Self {
        Self {
            client,
            dir: PathBuf::from(&config.dir),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Directory images are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the image for an article is (or would be) stored.
    pub fn local_image_path(&self, article_id: &str, image_url: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", article_id, image_extension(image_url)))
    }

    /// Download one image unless it is already present.
    pub async fn download(&self, article_id: &str, image_url: &str) -> Result<PathBuf> {
        if image_url.trim().is_empty() {
            return Err(FeedmergeError::Validation("no image URL".to_string()));
        }

        let path = self.local_image_path(article_id, image_url);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        let bytes = tokio::time::timeout(self.timeout, self.client.get(image_url))
            .await
            .map_err(|_| FeedmergeError::Fetch(format!("timed out fetching {}", image_url)))??;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Download images for the given ids. Returns how many are now on disk.
    pub async fn prefetch(&self, collection: &ArticleCollection, ids: &HashSet<String>) -> usize {
        let mut saved = 0;
        for article in collection.iter().filter(|a| ids.contains(&a.id)) {
            if article.image_url.is_empty() {
                continue;
            }
            match self.download(&article.id, &article.image_url).await {
                Ok(_) => saved += 1,
                Err(e) => debug!("Skipping image for {}: {}", article.id, e),
            }
        }
        if saved > 0 {
            debug!("Prefetched {} image(s) into {}", saved, self.dir.display());
        }
        saved
    }
}

/// Guess a file extension from the URL path, ignoring any query string.
pub fn image_extension(image_url: &str) -> &'static str {
    let base = image_url
        .split('?')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|ext| base.ends_with(*ext))
        .copied()
        .unwrap_or(DEFAULT_EXTENSION)
}

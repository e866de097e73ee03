//! Feed source list.
//!
//! The ordered list of feed URLs lives in a JSON array file. The order
//! matters: when two sources carry the same article, the earlier one wins.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};

use crate::Result;

/// Load the source list from `path`.
///
/// Non-string entries are skipped. An unreadable, invalid or empty file
/// yields `defaults`; a missing file is created holding `defaults`.
pub fn load_sources(path: impl AsRef<Path>, defaults: &[String]) -> Vec<String> {
    let path = path.as_ref();

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("Creating source list {} with defaults", path.display());
            if let Err(e) = save_sources(path, defaults) {
                warn!("Failed to write source list {}: {}", path.display(), e);
            }
            return defaults.to_vec();
        }
        Err(e) => {
            warn!("Failed to read source list {}: {}", path.display(), e);
            return defaults.to_vec();
        }
    };

    match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
        Ok(values) => {
            let sources: Vec<String> = values
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if sources.is_empty() {
                defaults.to_vec()
            } else {
                sources
            }
        }
        Err(e) => {
            warn!("Invalid source list {}: {}", path.display(), e);
            defaults.to_vec()
        }
    }
}

/// Write the source list as pretty-printed JSON.
pub fn save_sources(path: impl AsRef<Path>, sources: &[String]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(sources)
        .map_err(|e| crate::FeedmergeError::Validation(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Heuristic check that a URL looks like an RSS or Atom endpoint.
pub fn seems_like_feed_url(url: &str) -> bool {
    if !url.contains("://") {
        return false;
    }
    let lower = url.to_lowercase();
    [".xml", "/feed", "rss", "atom"]
        .iter()
        .any(|token| lower.contains(token))
}

/// Drop blank and repeated URLs, keeping the first occurrence.
pub fn dedupe_sources(sources: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

/// Load, clean and sanity-check the source list.
pub fn prepare_sources(path: impl AsRef<Path>, defaults: &[String]) -> Vec<String> {
    let sources = dedupe_sources(load_sources(path, defaults));
    for source in sources.iter().filter(|s| !seems_like_feed_url(s)) {
        warn!("Source does not look like a feed URL: {}", source);
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Vec<String> {
        vec!["https://www.vrt.be/vrtnws/nl.rss.articles.xml".to_string()]
    }

    #[test]
    fn test_missing_file_written_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");

        assert_eq!(load_sources(&path, &defaults()), defaults());
        assert!(path.exists());
        assert_eq!(load_sources(&path, &[]), defaults());
    }

    #[test]
    fn test_non_strings_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        std::fs::write(&path, r#"["https://a.example/rss", 42, null, "https://b.example/feed"]"#)
            .unwrap();

        assert_eq!(
            load_sources(&path, &defaults()),
            vec!["https://a.example/rss", "https://b.example/feed"]
        );
    }

    #[test]
    fn test_invalid_or_empty_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_sources(&path, &defaults()), defaults());

        std::fs::write(&path, "[1, 2]").unwrap();
        assert_eq!(load_sources(&path, &defaults()), defaults());

        std::fs::write(&path, "{\"feeds\": []}").unwrap();
        assert_eq!(load_sources(&path, &defaults()), defaults());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("feeds.json");
        let sources = vec![
            "https://b.example/atom.xml".to_string(),
            "https://a.example/rss".to_string(),
        ];

        save_sources(&path, &sources).unwrap();
        assert_eq!(load_sources(&path, &defaults()), sources);
    }

    #[test]
    fn test_seems_like_feed_url() {
        assert!(seems_like_feed_url("https://www.vrt.be/vrtnws/nl.rss.articles.xml"));
        assert!(seems_like_feed_url("https://blog.example.com/feed"));
        assert!(seems_like_feed_url("https://example.com/ATOM"));
        assert!(!seems_like_feed_url("https://example.com/news"));
        assert!(!seems_like_feed_url("example.com/rss"));
        assert!(!seems_like_feed_url(""));
    }

    #[test]
    fn test_dedupe_sources_keeps_order() {
        let sources = vec![
            "https://b.example/rss".to_string(),
            " https://a.example/rss ".to_string(),
            "".to_string(),
            "https://b.example/rss".to_string(),
            "https://a.example/rss".to_string(),
        ];
        assert_eq!(
            dedupe_sources(sources),
            vec!["https://b.example/rss", "https://a.example/rss"]
        );
    }
}

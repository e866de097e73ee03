//! Configuration module for feedmerge.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedmergeError, Result};

/// Feed source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Sources used when the sources file is missing or unusable.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Path to the JSON list of feed URLs.
    #[serde(default = "default_sources_file")]
    pub sources_file: String,
}

fn default_sources() -> Vec<String> {
    vec!["https://www.vrt.be/vrtnws/nl.rss.articles.xml".to_string()]
}

fn default_sources_file() -> String {
    "feeds.json".to_string()
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            sources_file: default_sources_file(),
        }
    }
}

/// Feed retrieval configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total time allowed for one source, including the body download.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum description length in characters.
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
    /// User agent sent with feed requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Refuse sources that resolve to loopback or private hosts.
    #[serde(default = "default_block_private_hosts")]
    pub block_private_hosts: bool,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_description_length() -> usize {
    10000
}

fn default_user_agent() -> String {
    concat!("feedmerge/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_block_private_hosts() -> bool {
    true
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            max_description_length: default_max_description_length(),
            user_agent: default_user_agent(),
            block_private_hosts: default_block_private_hosts(),
        }
    }
}

/// Poll scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Seconds between scheduled cycles.
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Run one cycle immediately at startup instead of waiting a full interval.
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_poll_interval() -> u64 {
    600 // 10 minutes
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            run_on_start: false,
        }
    }
}

/// Local snapshot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotConfig {
    /// Path to the CSV snapshot.
    #[serde(default = "default_snapshot_path")]
    pub path: String,
}

fn default_snapshot_path() -> String {
    "data/articles.csv".to_string()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
        }
    }
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Whether new articles are upserted into the durable store.
    #[serde(default = "default_db_enabled")]
    pub enabled: bool,
    /// sqlx connection URL.
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    /// Rows per upsert statement.
    #[serde(default = "default_db_batch_size")]
    pub batch_size: usize,
}

fn default_db_enabled() -> bool {
    true
}

fn default_db_url() -> String {
    "sqlite://data/feedmerge.db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_db_batch_size() -> usize {
    500
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            enabled: default_db_enabled(),
            url: default_db_url(),
            max_connections: default_db_max_connections(),
            batch_size: default_db_batch_size(),
        }
    }
}

/// Image prefetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Download images of newly added articles.
    #[serde(default = "default_media_enabled")]
    pub enabled: bool,
    /// Directory images are stored in.
    #[serde(default = "default_media_dir")]
    pub dir: String,
    /// Per-image download timeout in seconds.
    #[serde(default = "default_media_timeout")]
    pub timeout_secs: u64,
}

fn default_media_enabled() -> bool {
    true
}

fn default_media_dir() -> String {
    "media".to_string()
}

fn default_media_timeout() -> u64 {
    10
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enabled: default_media_enabled(),
            dir: default_media_dir(),
            timeout_secs: default_media_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty logs to stdout only.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedmerge.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Feed sources.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Feed retrieval.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Poll scheduling.
    #[serde(default)]
    pub poller: PollerConfig,
    /// Local snapshot.
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// Durable store.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Image prefetch.
    #[serde(default)]
    pub media: MediaConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedmergeError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedmergeError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDMERGE_DATABASE_URL`, then `DATABASE_URL`: durable store URL
    /// - `FEEDMERGE_LOG_LEVEL`: log level
    pub fn apply_env_overrides(&mut self) {
        let database_url = ["FEEDMERGE_DATABASE_URL", "DATABASE_URL"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.is_empty());
        if let Some(url) = database_url {
            self.database.url = url;
        }

        if let Ok(level) = std::env::var("FEEDMERGE_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.poller.interval_secs == 0 {
            return Err(FeedmergeError::Config(
                "poller.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.fetch.connect_timeout_secs == 0 || self.fetch.total_timeout_secs == 0 {
            return Err(FeedmergeError::Config(
                "fetch timeouts must be greater than zero".to_string(),
            ));
        }
        if self.database.enabled {
            if self.database.url.trim().is_empty() {
                return Err(FeedmergeError::Config(
                    "database is enabled but database.url is empty. \
                     Set it in config.toml or via FEEDMERGE_DATABASE_URL."
                        .to_string(),
                ));
            }
            if self.database.batch_size == 0 {
                return Err(FeedmergeError::Config(
                    "database.batch_size must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }
}

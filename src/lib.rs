//! feedmerge - syndication feed ingestion
//!
//! Polls RSS and Atom feeds, gives every article a stable id derived from its
//! URL, merges new articles into a deduplicated newest-first collection, and
//! persists the result to a local CSV snapshot and a durable SQL store.

pub mod article;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod poller;
pub mod sources;
pub mod store;

pub use article::{
    generate_id, merge, normalize_and_dedupe, Article, ArticleCollection, MergeOutcome, RawArticle,
};
pub use config::Config;
pub use db::{ArticleRepository, Database};
pub use error::{FeedmergeError, Result};
pub use feed::{FeedClient, FeedFetcher, HttpFeedClient};
pub use media::MediaPrefetcher;
pub use pipeline::{CycleReport, Pipeline};
pub use poller::{Command, PollState, Poller, PollerHandle, PollerStatus};
pub use store::{ArticleStore, PersistOutcome, Persister, SnapshotFile, SqlArticleStore};

//! Articles: identity, normalization and merging.

pub mod identity;
pub mod merge;
pub mod normalize;
pub mod types;

pub use identity::generate_id;
pub use merge::{merge, MergeOutcome};
pub use normalize::{normalize_and_dedupe, normalize_record, sort_newest_first, text_or_empty};
pub use types::{Article, ArticleCollection, RawArticle, SNAPSHOT_COLUMNS};

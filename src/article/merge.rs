//! Incremental merge of freshly fetched articles into the known collection.
//!
//! The merge only ever inserts. An id already present in the existing
//! collection keeps its stored fields even if the feed now says something
//! different, so a previously seen article never changes under a reader.

use std::collections::HashSet;

use super::types::ArticleCollection;

/// Result of merging a fetch into the existing collection.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    /// Existing articles plus the newly seen ones, normalized.
    pub combined: ArticleCollection,
    /// Ids present in the fetch but not in the existing collection.
    pub new_ids: HashSet<String>,
}

impl MergeOutcome {
    /// Check whether the fetch contributed anything.
    pub fn has_new(&self) -> bool {
        !self.new_ids.is_empty()
    }
}

/// Merge `fresh` into `existing`.
pub fn merge(existing: &ArticleCollection, fresh: &ArticleCollection) -> MergeOutcome {
    let existing = existing.renormalized();
    let fresh = fresh.renormalized();

    if existing.is_empty() {
        let new_ids = fresh.ids();
        return MergeOutcome {
            combined: fresh,
            new_ids,
        };
    }

    let known = existing.ids();
    let new_ids: HashSet<String> = fresh
        .iter()
        .filter(|a| !known.contains(&a.id))
        .map(|a| a.id.clone())
        .collect();

    let mut articles = existing.into_articles();
    articles.extend(fresh.select(&new_ids));

    MergeOutcome {
        combined: ArticleCollection::from_articles(articles),
        new_ids,
    }
}

//! Search engine over translations
//!
//! Filters are AND-combined. `key` and `content` are substring matches,
//! case-insensitive for ASCII, with `%`, `_` and `\` taken literally.
//! `locale` is exact. `tags` matches translations carrying at least one of
//! the listed names.

use lingo_core::ports::SearchIndex;
use lingo_core::{Result, SearchCriteria, Translation};
use std::sync::Arc;
use tracing::debug;

pub struct SearchEngine {
    index: Arc<dyn SearchIndex>,
}

impl SearchEngine {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Translation>> {
        let results = self.index.search(criteria).await?;
        debug!("Search {:?} matched {} translations", criteria, results.len());
        Ok(results)
    }
}

//! Translation types

use crate::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A keyed piece of text content for one locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub key: String,
    pub content: String,
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Hydrated tag set, ordered by tag name
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Translation {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }
}

/// Data required to create a translation.
///
/// Tags are referenced by name and created on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTranslation {
    pub key: String,
    pub content: String,
    pub locale: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTranslation {
    pub fn new(key: impl Into<String>, content: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            locale: locale.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Changes applied to an existing translation.
///
/// `tags: None` leaves the tag set untouched, `Some(vec![])` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUpdate {
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TranslationUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tags: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Flat key -> content lookup table for one locale
pub type LocaleExport = BTreeMap<String, String>;

/// Collapse duplicate names while keeping first-seen order
pub fn dedup_names(names: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.as_str())
        .filter(|n| seen.insert(*n))
        .collect()
}

/// Collapse duplicate ids while keeping first-seen order
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

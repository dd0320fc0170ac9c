//! Search filter types

use serde::{Deserialize, Serialize};

/// Raw search filters as supplied by a client.
///
/// `tags` is a comma-separated list of tag names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl SearchFilters {
    /// Normalize into criteria: values trimmed, blanks dropped, tag names
    /// split on commas, sorted and deduplicated.
    pub fn normalize(&self) -> SearchCriteria {
        let mut tags: Vec<String> = self
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        tags.sort();
        tags.dedup();

        SearchCriteria {
            key: non_blank(self.key.as_deref()),
            content: non_blank(self.content.as_deref()),
            locale: non_blank(self.locale.as_deref()),
            tags,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalized search predicates, all AND-combined.
///
/// `tags` matches translations carrying at least one of the names.
/// Field order is fixed so the JSON encoding is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub key: Option<String>,
    pub content: Option<String>,
    pub locale: Option<String>,
    pub tags: Vec<String>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.content.is_none() && self.locale.is_none() && self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let filters = SearchFilters {
            tags: Some(" web,mobile,,web , ".to_string()),
            ..Default::default()
        };
        let criteria = filters.normalize();
        assert_eq!(criteria.tags, vec!["mobile", "web"]);
        assert!(criteria.key.is_none());
    }

    #[test]
    fn test_blank_values_are_absent() {
        let filters = SearchFilters {
            key: Some("  ".to_string()),
            content: Some("".to_string()),
            locale: Some(" en ".to_string()),
            tags: Some(",".to_string()),
        };
        let criteria = filters.normalize();
        assert_eq!(criteria.locale.as_deref(), Some("en"));
        assert!(criteria.key.is_none());
        assert!(criteria.content.is_none());
        assert!(criteria.tags.is_empty());
        assert!(!criteria.is_empty());
        assert!(SearchFilters::default().normalize().is_empty());
    }

    #[test]
    fn test_tag_order_does_not_change_criteria() {
        let a = SearchFilters {
            tags: Some("web,mobile".to_string()),
            ..Default::default()
        };
        let b = SearchFilters {
            tags: Some("mobile,web".to_string()),
            ..Default::default()
        };
        assert_eq!(a.normalize(), b.normalize());
    }
}

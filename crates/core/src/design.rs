//! Design documents and the views they group
//!
//! A view is an opaque map/reduce pair. Nothing in this workspace interprets
//! the function bodies; they are carried verbatim to the server and compared
//! verbatim against what the server returns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named secondary-index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
}

impl View {
    /// Create a view with only a map function
    pub fn new(name: impl Into<String>, map: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map: map.into(),
            reduce: None,
        }
    }

    /// Create a view with both map and reduce functions
    pub fn with_reduce(
        name: impl Into<String>,
        map: impl Into<String>,
        reduce: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            map: map.into(),
            reduce: Some(reduce.into()),
        }
    }
}

/// A named group of views registered on a bucket
///
/// Equality is structural: two documents are equal when their names match
/// and they hold the same views keyed by view name. The server keeps views
/// in a JSON object, so declaration order is not part of the comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignDocument {
    name: String,
    views: Vec<View>,
}

impl DesignDocument {
    pub fn new(name: impl Into<String>, views: Vec<View>) -> Self {
        Self {
            name: name.into(),
            views,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Look up a view by name
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }

    /// Names that appear more than once, in sorted order
    pub fn duplicate_view_names(&self) -> Vec<&str> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for view in &self.views {
            *seen.entry(view.name.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect()
    }

    fn keyed_views(&self) -> BTreeMap<&str, &View> {
        self.views.iter().map(|v| (v.name.as_str(), v)).collect()
    }
}

impl PartialEq for DesignDocument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.views.len() == other.views.len()
            && self.keyed_views() == other.keyed_views()
    }
}

impl Eq for DesignDocument {}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name() -> View {
        View::new("by_name", "function (doc) { emit(doc.name, null); }")
    }

    fn by_expiry() -> View {
        View::with_reduce(
            "by_expiry",
            "function (doc) { emit(doc.expiry, null); }",
            "_count",
        )
    }

    #[test]
    fn test_equality_ignores_view_order() {
        let a = DesignDocument::new("tickets", vec![by_name(), by_expiry()]);
        let b = DesignDocument::new("tickets", vec![by_expiry(), by_name()]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_view_is_not_equal() {
        let a = DesignDocument::new("tickets", vec![by_name(), by_expiry()]);
        let b = DesignDocument::new("tickets", vec![by_name()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_changed_reduce_is_not_equal() {
        let a = DesignDocument::new("tickets", vec![by_expiry()]);
        let mut changed = by_expiry();
        changed.reduce = Some("_sum".to_string());
        let b = DesignDocument::new("tickets", vec![changed]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_name_mismatch_is_not_equal() {
        let a = DesignDocument::new("tickets", vec![by_name()]);
        let b = DesignDocument::new("sessions", vec![by_name()]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_duplicate_names_do_not_compare_equal_to_deduplicated() {
        let a = DesignDocument::new("tickets", vec![by_name(), by_name()]);
        let b = DesignDocument::new("tickets", vec![by_name()]);
        assert_ne!(a, b);
        assert_eq!(a.duplicate_view_names(), vec!["by_name"]);
        assert!(b.duplicate_view_names().is_empty());
    }

    #[test]
    fn test_view_lookup() {
        let doc = DesignDocument::new("tickets", vec![by_name(), by_expiry()]);
        assert_eq!(doc.view("by_expiry").and_then(|v| v.reduce.as_deref()), Some("_count"));
        assert!(doc.view("missing").is_none());
        assert!(!doc.is_empty());
    }
}

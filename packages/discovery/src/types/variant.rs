//! Catalog search requests and the prioritized variants built from them.

use serde::{Deserialize, Serialize};

/// A catalog-agnostic search request: free text, optional facet filter, sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query.
    pub text: String,

    /// Facet filter expression (Solr `fq` syntax for CKAN catalogs).
    pub filter: Option<String>,

    /// Sort order, e.g. `metadata_modified desc`.
    pub sort: Option<String>,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filter: None,
            sort: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Identity used for variant deduplication. Sort is not part of it:
    /// two requests returning the same set differ only in order.
    pub fn dedup_key(&self) -> (&str, Option<&str>) {
        (self.text.as_str(), self.filter.as_deref())
    }
}

/// One prioritized search attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    /// Short machine-friendly name, e.g. `municipal-publisher`.
    pub label: String,

    pub request: SearchRequest,

    /// 1 = tried first.
    pub priority: u32,

    /// Human-readable reason this variant exists.
    pub rationale: String,
}

impl QueryVariant {
    pub fn new(label: impl Into<String>, priority: u32, request: SearchRequest) -> Self {
        Self {
            label: label.into(),
            request,
            priority,
            rationale: String::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }
}

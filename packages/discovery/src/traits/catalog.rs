//! Catalog trait: the read-only search endpoint of an open-data registry.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::types::{dataset::CatalogDataset, variant::SearchRequest};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPage {
    /// Total matches reported by the catalog (may exceed `datasets.len()`).
    pub count: u64,
    pub datasets: Vec<CatalogDataset>,
}

impl SearchPage {
    pub fn new(count: u64, datasets: Vec<CatalogDataset>) -> Self {
        Self { count, datasets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Positive total count AND a non-empty result list.
    pub fn has_data(&self) -> bool {
        self.count > 0 && !self.datasets.is_empty()
    }
}

/// Catalog search service.
///
/// # Implementations
///
/// - `CkanCatalog` - CKAN action API (dati.gov.it and regional portals)
/// - `RateLimitedCatalog` - Wrapper that enforces a request quota
/// - `MockCatalog` - For testing
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Run one search with a result-row cap.
    async fn search(&self, request: &SearchRequest, rows: u32) -> CatalogResult<SearchPage>;

    /// Get the catalog name (for logging).
    fn name(&self) -> &str {
        "catalog"
    }
}

//! CKAN-backed catalog (dati.gov.it and compatible portals).

use async_trait::async_trait;
use ckan_client::{CkanClient, PackageSearchParams};
use tracing::instrument;

use crate::error::CatalogResult;
use crate::traits::catalog::{Catalog, SearchPage};
use crate::types::dataset::CatalogDataset;
use crate::types::variant::SearchRequest;

/// Catalog over a CKAN action API.
#[derive(Clone)]
pub struct CkanCatalog {
    client: CkanClient,
}

impl CkanCatalog {
    pub fn new(client: CkanClient) -> Self {
        Self { client }
    }

    /// Catalog for the public dati.gov.it endpoint.
    pub fn dati_gov_it() -> Self {
        Self::new(CkanClient::new(ckan_client::DATI_GOV_IT))
    }

    fn params(request: &SearchRequest, rows: u32) -> PackageSearchParams {
        let mut params = PackageSearchParams::new(&request.text, rows);
        if let Some(filter) = &request.filter {
            params = params.with_fq(filter);
        }
        if let Some(sort) = &request.sort {
            params = params.with_sort(sort);
        }
        params
    }
}

#[async_trait]
impl Catalog for CkanCatalog {
    #[instrument(skip(self), fields(base = %self.client.base_url()))]
    async fn search(&self, request: &SearchRequest, rows: u32) -> CatalogResult<SearchPage> {
        let result = self
            .client
            .package_search(&Self::params(request, rows))
            .await?;

        Ok(SearchPage::new(
            result.count,
            result.results.into_iter().map(CatalogDataset::from).collect(),
        ))
    }

    fn name(&self) -> &str {
        "ckan"
    }
}

//! Pure CKAN action API client.
//!
//! A minimal client for CKAN open-data portals (dati.gov.it and the regional
//! and municipal portals it harvests). Only the read-only `package_search`
//! action is supported.
//!
//! # Example
//!
//! ```rust,ignore
//! use ckan_client::{CkanClient, PackageSearchParams};
//!
//! let client = CkanClient::new("https://www.dati.gov.it/opendata/api/3/action");
//!
//! let params = PackageSearchParams::new("reati Milano", 50).with_fq("organization:istat");
//! let page = client.package_search(&params).await?;
//! for package in &page.results {
//!     println!("{}", package.title);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{CkanError, Result};
pub use types::{
    Group, Organization, Package, PackageResource, PackageSearchParams, PackageSearchResult, Tag,
};

use types::ActionResponse;

/// Public dati.gov.it action endpoint.
pub const DATI_GOV_IT: &str = "https://www.dati.gov.it/opendata/api/3/action";

#[derive(Clone)]
pub struct CkanClient {
    client: reqwest::Client,
    base_url: String,
}

impl CkanClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, user agent).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `package_search` and unwrap the action envelope.
    pub async fn package_search(
        &self,
        params: &PackageSearchParams,
    ) -> Result<PackageSearchResult> {
        let url = format!("{}/package_search", self.base_url);
        tracing::debug!(q = %params.q, fq = ?params.fq, rows = params.rows, "CKAN package_search");

        let resp = self.client.get(&url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CkanError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let envelope: ActionResponse<PackageSearchResult> = resp.json().await?;
        unwrap_envelope(envelope)
    }
}

fn unwrap_envelope<T>(envelope: ActionResponse<T>) -> Result<T> {
    if !envelope.success {
        let message = envelope
            .error
            .map(|e| e.describe())
            .unwrap_or_else(|| "success=false".to_string());
        return Err(CkanError::Unsuccessful(message));
    }
    envelope
        .result
        .ok_or_else(|| CkanError::Unsuccessful("missing result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_successful_search() {
        let body = r#"{
            "success": true,
            "result": {
                "count": 1,
                "results": [{
                    "id": "abc",
                    "name": "reati-milano",
                    "title": "Reati denunciati - Milano",
                    "organization": {"name": "comune-di-milano", "title": "Comune di Milano"},
                    "tags": [{"name": "sicurezza"}],
                    "groups": [{"name": "giustizia", "title": "Giustizia"}],
                    "resources": [{"url": "https://example.org/reati.csv", "format": "CSV"}]
                }]
            }
        }"#;
        let envelope: ActionResponse<PackageSearchResult> = serde_json::from_str(body).unwrap();
        let result = unwrap_envelope(envelope).unwrap();

        assert_eq!(result.count, 1);
        let package = &result.results[0];
        assert_eq!(package.title, "Reati denunciati - Milano");
        assert_eq!(package.organization.as_ref().unwrap().name, "comune-di-milano");
        assert_eq!(package.resources[0].format.as_deref(), Some("CSV"));
        assert!(package.notes.is_none());
    }

    #[test]
    fn test_unwrap_unsuccessful_search() {
        let body = r#"{
            "success": false,
            "error": {"message": "Search error", "__type": "Search Query Error"}
        }"#;
        let envelope: ActionResponse<PackageSearchResult> = serde_json::from_str(body).unwrap();
        let err = unwrap_envelope(envelope).unwrap_err();

        assert!(matches!(err, CkanError::Unsuccessful(ref m) if m.contains("Search Query Error")));
    }

    #[test]
    fn test_search_params_query_string() {
        let params = PackageSearchParams::new("reati", 50)
            .with_fq("organization:istat")
            .with_sort("metadata_modified desc");
        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(value["q"], "reati");
        assert_eq!(value["rows"], 50);
        assert_eq!(value["fq"], "organization:istat");

        let bare = serde_json::to_value(PackageSearchParams::new("x", 10)).unwrap();
        assert!(bare.get("fq").is_none());
        assert!(bare.get("sort").is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_package_search() {
        let client = CkanClient::new(DATI_GOV_IT);
        let page = client
            .package_search(&PackageSearchParams::new("popolazione", 5))
            .await
            .unwrap();
        assert!(page.count > 0);
    }
}

//! The value handed to the answer-synthesis consumer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dataset::CatalogDataset;
use super::query::NormalizedQuery;
use super::sample::Record;

/// How the candidate datasets were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DiscoveryRoute {
    /// A targeted variant returned data.
    Targeted {
        variant: String,
        priority: u32,
        attempts: usize,
    },
    /// Targeted search was empty; the broad geography scan found candidates.
    BroadFallback { scanned: usize, kept: usize },
    /// Nothing was found (or the run was cancelled).
    NotFound,
}

/// Short description of a candidate dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub title: String,
    pub publisher: Option<String>,
    pub formats: Vec<String>,
    pub resource_count: usize,
    /// True for the dataset whose sample was accepted.
    pub accepted: bool,
}

impl DatasetSummary {
    pub fn of(dataset: &CatalogDataset) -> Self {
        let mut formats: Vec<String> = Vec::new();
        for resource in &dataset.resources {
            let label = resource
                .format
                .clone()
                .unwrap_or_else(|| format!("{:?}", resource.format()).to_lowercase())
                .to_uppercase();
            if !formats.contains(&label) {
                formats.push(label);
            }
        }
        Self {
            id: dataset.id.clone(),
            title: dataset.title.clone(),
            publisher: dataset.publishers.first().cloned(),
            formats,
            resource_count: dataset.resources.len(),
            accepted: false,
        }
    }
}

/// Where the accepted rows came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedSource {
    pub dataset_id: String,
    pub dataset_title: String,
    pub resource_url: String,
    pub provenance: String,
    pub digest: String,
}

/// Result of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub query: NormalizedQuery,
    pub route: DiscoveryRoute,
    /// Candidate datasets considered, in rank order (at most 12).
    pub datasets: Vec<DatasetSummary>,
    /// Filtered rows (at most 20).
    pub rows: Vec<Record>,
    pub has_real_data: bool,
    pub source: Option<AcceptedSource>,
}

impl PipelineResult {
    /// The "no usable data found" terminal outcome.
    pub fn no_data(run_id: Uuid, query: NormalizedQuery) -> Self {
        Self {
            run_id,
            query,
            route: DiscoveryRoute::NotFound,
            datasets: Vec::new(),
            rows: Vec::new(),
            has_real_data: false,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::dataset::Resource;

    #[test]
    fn test_summary_deduplicates_formats() {
        let dataset = CatalogDataset::new("d1", "Reati")
            .with_publisher("ISTAT")
            .with_resource(Resource::new("https://a/x.csv").with_format("csv"))
            .with_resource(Resource::new("https://a/y.csv").with_format("CSV"))
            .with_resource(Resource::new("https://a/z.json"));

        let summary = DatasetSummary::of(&dataset);
        assert_eq!(summary.formats, vec!["CSV".to_string(), "JSON".to_string()]);
        assert_eq!(summary.publisher.as_deref(), Some("ISTAT"));
        assert_eq!(summary.resource_count, 3);
    }

    #[test]
    fn test_no_data_serializes_has_real_data() {
        let result = PipelineResult::no_data(Uuid::nil(), NormalizedQuery::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["hasRealData"], false);
        assert_eq!(json["route"]["kind"], "not_found");
        assert!(json["rows"].as_array().unwrap().is_empty());
    }
}

//! Resource selection and bounded sampling.

use tracing::{debug, instrument};

use super::parse::{parse_delimited, parse_json};
use crate::error::FetchError;
use crate::traits::fetcher::ResourceFetcher;
use crate::types::config::DiscoveryConfig;
use crate::types::dataset::{CatalogDataset, Resource, ResourceFormat};
use crate::types::sample::{Rejection, Sample};

/// Result of sampling one resource, before relevance filtering.
#[derive(Debug)]
pub enum SampleOutcome {
    Sampled(Sample),
    Rejected(Rejection),
    Failed(FetchError),
}

/// Structured resources of a dataset, JSON first, catalog order within a rank.
pub fn rank_resources(dataset: &CatalogDataset) -> Vec<&Resource> {
    let mut ranked: Vec<&Resource> = dataset
        .resources
        .iter()
        .filter(|r| r.format().is_structured())
        .collect();
    ranked.sort_by(|a, b| b.format().rank().cmp(&a.format().rank()));
    ranked
}

/// Probe, fetch at most the byte ceiling, parse capped rows.
///
/// A probe answering with an HTTP status (HEAD is often unsupported) leaves
/// the length unknown and the fetch goes ahead; transport and security errors
/// end the attempt.
#[instrument(skip(fetcher, resource, config), fields(url = %resource.url))]
pub async fn sample_resource<F: ResourceFetcher + ?Sized>(
    fetcher: &F,
    resource: &Resource,
    config: &DiscoveryConfig,
) -> SampleOutcome {
    let format = resource.format();
    if !format.is_structured() {
        return SampleOutcome::Rejected(Rejection::UnsupportedFormat);
    }

    match fetcher.probe(&resource.url).await {
        Ok(Some(bytes)) if bytes > config.max_resource_bytes => {
            return SampleOutcome::Rejected(Rejection::TooLarge { bytes });
        }
        Ok(_) => {}
        Err(FetchError::Status { status, .. }) => {
            debug!(status, "Probe refused, fetching without a length");
        }
        Err(e) => return SampleOutcome::Failed(e),
    }

    // One byte past the ceiling tells a truncated body from an exact fit.
    let mut body = match fetcher
        .fetch(&resource.url, config.max_resource_bytes.saturating_add(1))
        .await
    {
        Ok(body) => body,
        Err(e) => return SampleOutcome::Failed(e),
    };
    let ceiling = usize::try_from(config.max_resource_bytes).unwrap_or(usize::MAX);
    let truncated = body.len() > ceiling;
    body.truncate(ceiling);
    if truncated && matches!(format, ResourceFormat::Delimited) {
        // The last line was cut mid-row; keep complete lines only.
        let complete = body.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
        body.truncate(complete);
    }

    let text = String::from_utf8_lossy(&body);
    let parsed = match format {
        ResourceFormat::Json => parse_json(&text, config.max_sample_rows)
            .map(|(rows, shape)| (rows, format!("JSON, {}", shape))),
        ResourceFormat::Delimited => parse_delimited(
            &text,
            config.max_delimited_lines,
            config.max_sample_rows,
        )
        .map(|(rows, delimiter)| (rows, format!("delimited text, {:?} separator", delimiter))),
        ResourceFormat::Other => return SampleOutcome::Rejected(Rejection::UnsupportedFormat),
    };

    match parsed {
        Ok((rows, _)) if rows.is_empty() => SampleOutcome::Rejected(Rejection::NoRows {
            detail: "no data rows".to_string(),
        }),
        Ok((rows, description)) => {
            let provenance = format!(
                "{} rows from {}{}",
                rows.len(),
                description,
                if truncated { ", body truncated" } else { "" }
            );
            debug!(rows = rows.len(), "Resource sampled");
            SampleOutcome::Sampled(Sample::new(rows, format, provenance))
        }
        Err(detail) => {
            debug!(%detail, "Resource unparseable");
            SampleOutcome::Rejected(Rejection::NoRows { detail })
        }
    }
}

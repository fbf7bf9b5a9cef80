//! The discovery orchestrator.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::entities::{extract_entities, HeuristicExtractor};
use super::fallback::broad_scan;
use super::relevance::RelevanceFilter;
use super::sampler::{rank_resources, sample_resource, SampleOutcome};
use super::search::execute_variants;
use super::variants::build_variants;
use crate::error::{DiscoveryError, Result};
use crate::gazetteer::{Gazetteer, GazetteerMatcher};
use crate::ontology::Ontology;
use crate::traits::catalog::Catalog;
use crate::traits::extractor::RemoteExtractor;
use crate::traits::fetcher::ResourceFetcher;
use crate::types::config::DiscoveryConfig;
use crate::types::dataset::{CatalogDataset, Resource};
use crate::types::query::NormalizedQuery;
use crate::types::result::{AcceptedSource, DatasetSummary, DiscoveryRoute, PipelineResult};
use crate::types::sample::{AttemptOutcome, Sample};
use crate::types::variant::QueryVariant;

/// Longest question accepted, in characters.
pub const MAX_QUESTION_CHARS: usize = 2000;

/// Reject questions the pipeline cannot meaningfully run on.
pub fn validate_question(question: &str) -> Result<&str> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(DiscoveryError::InvalidQuestion {
            reason: "question is empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_QUESTION_CHARS {
        return Err(DiscoveryError::InvalidQuestion {
            reason: format!("question exceeds {} characters", MAX_QUESTION_CHARS),
        });
    }
    if trimmed.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return Err(DiscoveryError::InvalidQuestion {
            reason: "question contains control characters".to_string(),
        });
    }
    Ok(trimmed)
}

/// One resource queued for sampling.
struct WorkItem<'d> {
    dataset_index: usize,
    dataset: &'d CatalogDataset,
    resource: &'d Resource,
}

/// Question-to-sample pipeline over a catalog and a fetcher.
///
/// # Example
///
/// ```rust,ignore
/// let discovery = Discovery::new(catalog, ValidatedFetcher::new(HttpFetcher::new()))
///     .with_config(DiscoveryConfig::default());
/// let result = discovery.run("Confronta i reati a Milano negli ultimi 5 anni").await?;
/// ```
pub struct Discovery<C: Catalog, F: ResourceFetcher> {
    catalog: C,
    fetcher: F,
    remote: Option<Box<dyn RemoteExtractor>>,
    ontology: Ontology,
    gazetteer: Gazetteer,
    matcher: GazetteerMatcher,
    config: DiscoveryConfig,
}

impl<C: Catalog, F: ResourceFetcher> Discovery<C, F> {
    pub fn new(catalog: C, fetcher: F) -> Self {
        let gazetteer = Gazetteer::italian_default();
        Self {
            catalog,
            fetcher,
            remote: None,
            ontology: Ontology::italian_default(),
            matcher: gazetteer.matcher(),
            gazetteer,
            config: DiscoveryConfig::default(),
        }
    }

    pub fn with_remote_extractor(mut self, extractor: impl RemoteExtractor + 'static) -> Self {
        self.remote = Some(Box::new(extractor));
        self
    }

    pub fn with_ontology(mut self, ontology: Ontology) -> Self {
        self.ontology = ontology;
        self
    }

    pub fn with_gazetteer(mut self, gazetteer: Gazetteer) -> Self {
        self.matcher = gazetteer.matcher();
        self.gazetteer = gazetteer;
        self
    }

    pub fn with_config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Entity extraction alone.
    pub async fn extract(&self, question: &str) -> NormalizedQuery {
        let heuristics = HeuristicExtractor::new(
            &self.ontology,
            &self.gazetteer,
            &self.matcher,
            self.config.current_year,
        );
        extract_entities(question, self.remote.as_deref(), &heuristics).await
    }

    /// Variant generation alone.
    pub fn variants(&self, query: &NormalizedQuery) -> Vec<QueryVariant> {
        build_variants(&query.topic, &query.geography, &self.ontology, &self.gazetteer)
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, question: &str) -> Result<PipelineResult> {
        self.run_with_cancel(question, CancellationToken::new()).await
    }

    /// Run the pipeline; cancellation yields the no-data result.
    ///
    /// Only a malformed question is an error. Every failure past that point
    /// degrades to [`PipelineResult::no_data`].
    pub async fn run_with_cancel(
        &self,
        question: &str,
        cancel: CancellationToken,
    ) -> Result<PipelineResult> {
        let question = validate_question(question)?;
        self.config.validate().map_err(DiscoveryError::Config)?;

        let run_id = Uuid::now_v7();
        let span = info_span!("discovery", %run_id);

        async move {
            let query = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled during extraction");
                    return Ok(PipelineResult::no_data(run_id, NormalizedQuery::default()));
                }
                query = self.extract(question) => query,
            };

            info!(
                topic = %query.topic.canonical,
                place = ?query.geography.token(),
                years = ?query.year_range(),
                "Question normalized"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Cancelled");
                    PipelineResult::no_data(run_id, query)
                }
                result = self.discover(run_id, query.clone()) => result,
            };

            info!(
                has_real_data = result.has_real_data,
                rows = result.rows.len(),
                candidates = result.datasets.len(),
                "Discovery finished"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn discover(&self, run_id: Uuid, query: NormalizedQuery) -> PipelineResult {
        let variants = self.variants(&query);
        debug!(variants = variants.len(), "Variants built");

        let targeted = execute_variants(&self.catalog, &variants, self.config.search_rows).await;

        let (mut candidates, route) = match targeted.winner {
            Some(winner) => (
                targeted.datasets,
                DiscoveryRoute::Targeted {
                    variant: winner.label,
                    priority: winner.priority,
                    attempts: targeted.attempts,
                },
            ),
            None => {
                let fallback =
                    broad_scan(&self.catalog, &query, &self.ontology, &self.config).await;
                if fallback.candidates.is_empty() {
                    info!("No candidate datasets");
                    return PipelineResult::no_data(run_id, query);
                }
                let kept = fallback.candidates.len();
                (
                    fallback.candidates.into_iter().map(|s| s.dataset).collect(),
                    DiscoveryRoute::BroadFallback {
                        scanned: fallback.scanned,
                        kept,
                    },
                )
            }
        };
        candidates.truncate(self.config.max_candidates);

        let mut summaries: Vec<DatasetSummary> = candidates.iter().map(DatasetSummary::of).collect();
        let accepted = self.sample_candidates(&candidates, &query).await;

        let mut result = PipelineResult::no_data(run_id, query);
        result.route = route;
        if let Some((index, resource, sample)) = accepted {
            let dataset = &candidates[index];
            summaries[index].accepted = true;
            result.source = Some(AcceptedSource {
                dataset_id: dataset.id.clone(),
                dataset_title: dataset.title.clone(),
                resource_url: resource.url.clone(),
                provenance: sample.provenance.clone(),
                digest: sample.digest(),
            });
            result.has_real_data = !sample.is_empty();
            result.rows = sample.rows;
        }
        result.datasets = summaries;
        result
    }

    /// Try ranked resources of ranked datasets; first acceptance wins.
    ///
    /// Up to `sample_concurrency` attempts run ahead, but outcomes are
    /// consumed in queue order, so the winner is the same as a sequential run.
    async fn sample_candidates<'d>(
        &self,
        candidates: &'d [CatalogDataset],
        query: &NormalizedQuery,
    ) -> Option<(usize, &'d Resource, Sample)> {
        let queue: Vec<WorkItem<'d>> = candidates
            .iter()
            .enumerate()
            .flat_map(|(dataset_index, dataset)| {
                rank_resources(dataset)
                    .into_iter()
                    .map(move |resource| WorkItem {
                        dataset_index,
                        dataset,
                        resource,
                    })
            })
            .collect();
        debug!(resources = queue.len(), "Sampling queue built");

        let filter = RelevanceFilter::new(
            query,
            &self.gazetteer,
            self.config.year_match,
            self.config.max_sample_rows,
        );
        let filter = &filter;

        let mut attempts = stream::iter(queue)
            .map(|item| async move {
                let outcome = match sample_resource(&self.fetcher, item.resource, &self.config).await {
                    SampleOutcome::Sampled(sample) => {
                        match filter.evaluate(sample, item.dataset, item.resource) {
                            Ok(kept) => AttemptOutcome::Accepted(kept),
                            Err(rejection) => AttemptOutcome::Rejected(rejection),
                        }
                    }
                    SampleOutcome::Rejected(rejection) => AttemptOutcome::Rejected(rejection),
                    SampleOutcome::Failed(e) => AttemptOutcome::Failed(e),
                };
                (item, outcome)
            })
            .buffered(self.config.sample_concurrency.max(1));

        while let Some((item, outcome)) = attempts.next().await {
            match outcome {
                AttemptOutcome::Accepted(sample) => {
                    info!(
                        dataset = %item.dataset.id,
                        url = %item.resource.url,
                        rows = sample.len(),
                        "Sample accepted"
                    );
                    return Some((item.dataset_index, item.resource, sample));
                }
                AttemptOutcome::Rejected(rejection) => {
                    debug!(
                        dataset = %item.dataset.id,
                        url = %item.resource.url,
                        %rejection,
                        "Sample rejected"
                    );
                }
                AttemptOutcome::Failed(e) => {
                    warn!(
                        dataset = %item.dataset.id,
                        url = %item.resource.url,
                        error = %e,
                        "Resource fetch failed"
                    );
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCatalog, MockFetcher};
    use crate::traits::catalog::SearchPage;

    #[test]
    fn test_validate_question() {
        assert_eq!(validate_question("  reati a Milano ").unwrap(), "reati a Milano");
        assert!(validate_question("   ").is_err());
        assert!(validate_question("reati\u{0007}").is_err());
        assert!(validate_question(&"a".repeat(MAX_QUESTION_CHARS + 1)).is_err());
        assert!(validate_question("riga uno\nriga due").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_question_is_the_only_error() {
        let discovery = Discovery::new(MockCatalog::new(), MockFetcher::new());
        let err = discovery.run("").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidQuestion { .. }));
    }

    #[tokio::test]
    async fn test_first_acceptance_wins_in_queue_order() {
        let dataset = CatalogDataset::new("d1", "Reati a Milano")
            .with_resource(Resource::new("https://a/slow.csv"))
            .with_resource(Resource::new("https://a/fast.csv"));
        let catalog = MockCatalog::new().with_default(SearchPage::new(1, vec![dataset]));
        let fetcher = MockFetcher::new()
            .with_body("https://a/slow.csv", "citta,anno\nMilano,2023\n")
            .with_body("https://a/fast.csv", "citta,anno\nMilano,2024\n")
            .with_delay("https://a/slow.csv", std::time::Duration::from_millis(50));
        let discovery = Discovery::new(catalog, fetcher)
            .with_config(DiscoveryConfig::default().with_current_year(2026));

        let result = discovery.run("reati a Milano negli ultimi 5 anni").await.unwrap();
        assert!(result.has_real_data);
        assert_eq!(result.source.unwrap().resource_url, "https://a/slow.csv");
        assert!(result.datasets[0].accepted);
    }

    #[tokio::test]
    async fn test_cancelled_run_reports_no_data() {
        let catalog = MockCatalog::new();
        let discovery = Discovery::new(catalog.clone(), MockFetcher::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = discovery
            .run_with_cancel("reati a Milano", cancel)
            .await
            .unwrap();
        assert!(!result.has_real_data);
        assert_eq!(result.route, DiscoveryRoute::NotFound);
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_slow_fetch_stops_promptly() {
        let dataset = CatalogDataset::new("d1", "Reati a Milano")
            .with_resource(Resource::new("https://a/slow.csv"));
        let catalog = MockCatalog::new().with_default(SearchPage::new(1, vec![dataset]));
        let fetcher = MockFetcher::new()
            .with_body("https://a/slow.csv", "citta,anno\nMilano,2023\n")
            .with_delay("https://a/slow.csv", std::time::Duration::from_secs(30));
        let discovery = Discovery::new(catalog, fetcher.clone())
            .with_config(DiscoveryConfig::default().with_current_year(2026));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            discovery.run_with_cancel("reati a Milano negli ultimi 5 anni", cancel),
        )
        .await
        .expect("cancellation should end the run")
        .unwrap();

        assert_eq!(fetcher.fetch_count(), 1);
        assert!(!result.has_real_data);
        assert!(result.rows.is_empty());
        assert!(result.source.is_none());
        assert_eq!(result.query.geography.city.as_deref(), Some("Milano"));
    }
}

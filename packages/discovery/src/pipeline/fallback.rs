//! Broad fallback scan: search on the place alone, re-rank locally by topic.

use tracing::{debug, info, warn};

use crate::ontology::Ontology;
use crate::text::contains_term;
use crate::traits::catalog::Catalog;
use crate::types::config::DiscoveryConfig;
use crate::types::dataset::CatalogDataset;
use crate::types::query::NormalizedQuery;
use crate::types::variant::SearchRequest;

pub const TITLE_WEIGHT: i32 = 5;
pub const DESCRIPTION_WEIGHT: i32 = 3;
pub const TAG_WEIGHT: i32 = 2;
pub const GROUP_WEIGHT: i32 = 2;
pub const PUBLISHER_WEIGHT: i32 = 1;
pub const FORMAT_WEIGHT: i32 = 1;

/// A dataset with its local topical score.
#[derive(Debug, Clone)]
pub struct ScoredDataset {
    pub dataset: CatalogDataset,
    pub score: i32,
}

/// What the broad scan produced.
#[derive(Debug, Clone, Default)]
pub struct FallbackOutcome {
    /// Kept candidates, best first.
    pub candidates: Vec<ScoredDataset>,

    /// Datasets returned by the catalog before scoring.
    pub scanned: usize,
}

/// Topical score of one dataset.
///
/// Each field contributes its weight once if any topic term occurs in it.
/// The structured-format bonus only applies on top of another signal, so a
/// CSV about something else never survives the cut.
pub fn topic_score(dataset: &CatalogDataset, query: &NormalizedQuery, ontology: &Ontology) -> i32 {
    let terms = query.topic.terms();
    let mentions = |text: &str| terms.iter().any(|t| contains_term(text, t));

    let mut score = 0;
    if mentions(&dataset.title) {
        score += TITLE_WEIGHT;
    }
    if dataset.description.as_deref().is_some_and(mentions) {
        score += DESCRIPTION_WEIGHT;
    }
    if dataset.tags.iter().any(|t| mentions(t)) {
        score += TAG_WEIGHT;
    }
    if dataset.groups.iter().any(|g| mentions(g)) {
        score += GROUP_WEIGHT;
    }

    let publishers = ontology.publishers_for(&query.topic);
    let organizations = ontology.organizations_for(&query.topic);
    let authoritative = !query.topic.is_generic()
        && (dataset
            .publishers
            .iter()
            .any(|p| publishers.iter().any(|a| a.eq_ignore_ascii_case(p)))
            || dataset
                .organization
                .as_deref()
                .is_some_and(|o| organizations.iter().any(|a| a.eq_ignore_ascii_case(o))));
    if authoritative {
        score += PUBLISHER_WEIGHT;
    }

    if score > 0 && dataset.has_structured_resource() {
        score += FORMAT_WEIGHT;
    }

    score
}

/// Score, drop non-positive, stable-sort descending, cap.
pub fn rank_candidates(
    datasets: Vec<CatalogDataset>,
    query: &NormalizedQuery,
    ontology: &Ontology,
    max_candidates: usize,
) -> Vec<ScoredDataset> {
    let mut scored: Vec<ScoredDataset> = datasets
        .into_iter()
        .map(|dataset| {
            let score = topic_score(&dataset, query, ontology);
            ScoredDataset { dataset, score }
        })
        .filter(|s| s.score > 0)
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(max_candidates);
    scored
}

/// Text for the broad search, or `None` when the scan should not run.
pub fn broad_request(query: &NormalizedQuery, config: &DiscoveryConfig) -> Option<SearchRequest> {
    if let Some(place) = query.geography.token() {
        let text = if place.contains(char::is_whitespace) {
            format!("\"{}\"", place)
        } else {
            place.to_string()
        };
        return Some(SearchRequest::new(text));
    }

    if config.broad_scan_without_geography && !query.topic.is_generic() {
        return Some(SearchRequest::new(query.topic.terms().join(" OR ")));
    }

    None
}

/// Run the broad scan.
pub async fn broad_scan<C: Catalog + ?Sized>(
    catalog: &C,
    query: &NormalizedQuery,
    ontology: &Ontology,
    config: &DiscoveryConfig,
) -> FallbackOutcome {
    let Some(request) = broad_request(query, config) else {
        debug!("No place and topic-only scan disabled, skipping broad scan");
        return FallbackOutcome::default();
    };

    let page = match catalog.search(&request, config.fallback_rows).await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, text = %request.text, "Broad scan failed");
            return FallbackOutcome::default();
        }
    };

    let scanned = page.datasets.len();
    let candidates = rank_candidates(page.datasets, query, ontology, config.max_candidates);
    info!(
        scanned,
        kept = candidates.len(),
        text = %request.text,
        "Broad scan ranked"
    );

    FallbackOutcome {
        candidates,
        scanned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCatalog;
    use crate::traits::catalog::SearchPage;
    use crate::types::dataset::Resource;
    use crate::types::query::Geography;
    use proptest::prelude::*;

    fn reati_milano() -> NormalizedQuery {
        let ontology = Ontology::italian_default();
        NormalizedQuery::new(Geography::city("Milano"), [], ontology.canonicalize("reati"))
    }

    #[test]
    fn test_field_weights() {
        let ontology = Ontology::italian_default();
        let query = reati_milano();

        let title_only = CatalogDataset::new("a", "Reati denunciati a Milano");
        assert_eq!(topic_score(&title_only, &query, &ontology), TITLE_WEIGHT);

        let everything = CatalogDataset::new("b", "Delitti")
            .with_description("Crimini per quartiere")
            .with_tag("criminalità")
            .with_group("furti")
            .with_publisher("ISTAT")
            .with_resource(Resource::new("https://x/y.csv"));
        assert_eq!(
            topic_score(&everything, &query, &ontology),
            TITLE_WEIGHT + DESCRIPTION_WEIGHT + TAG_WEIGHT + GROUP_WEIGHT + PUBLISHER_WEIGHT + FORMAT_WEIGHT
        );
    }

    #[test]
    fn test_format_alone_scores_nothing() {
        let ontology = Ontology::italian_default();
        let dataset = CatalogDataset::new("a", "Orari biblioteche")
            .with_resource(Resource::new("https://x/y.csv"));
        assert_eq!(topic_score(&dataset, &reati_milano(), &ontology), 0);
    }

    #[test]
    fn test_rank_is_stable_and_capped() {
        let ontology = Ontology::italian_default();
        let query = reati_milano();
        let datasets = vec![
            CatalogDataset::new("tag-1", "Milano").with_tag("reati"),
            CatalogDataset::new("title", "Reati"),
            CatalogDataset::new("none", "Parchi"),
            CatalogDataset::new("tag-2", "Milano").with_tag("furti"),
        ];

        let ranked = rank_candidates(datasets, &query, &ontology, 2);
        let ids: Vec<&str> = ranked.iter().map(|s| s.dataset.id.as_str()).collect();
        assert_eq!(ids, vec!["title", "tag-1"]);
    }

    #[test]
    fn test_broad_request() {
        let config = DiscoveryConfig::default();
        let query = reati_milano();
        assert_eq!(broad_request(&query, &config).unwrap().text, "Milano");

        let placeless = NormalizedQuery::new(Geography::default(), [], query.topic.clone());
        assert!(broad_request(&placeless, &config).is_none());

        let config = config.with_broad_scan_without_geography(true);
        let request = broad_request(&placeless, &config).unwrap();
        assert!(request.text.starts_with("reati OR "));
    }

    #[tokio::test]
    async fn test_broad_scan_uses_fallback_rows() {
        let ontology = Ontology::italian_default();
        let catalog = MockCatalog::new().with_page(
            SearchRequest::new("Milano"),
            SearchPage::new(
                2,
                vec![
                    CatalogDataset::new("a", "Reati 2023"),
                    CatalogDataset::new("b", "Parchi"),
                ],
            ),
        );
        let config = DiscoveryConfig::default();

        let outcome = broad_scan(&catalog, &reati_milano(), &ontology, &config).await;
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(catalog.calls()[0].1, 100);
    }

    #[test]
    fn test_synonym_in_title_strictly_outscores() {
        let ontology = Ontology::italian_default();
        let query = reati_milano();
        let shared = |title: &str| {
            CatalogDataset::new("d", title)
                .with_description("Serie storica comunale")
                .with_publisher("Comune di Milano")
                .with_resource(Resource::new("https://x/y.csv"))
        };

        let with_synonym = topic_score(&shared("Delitti denunciati"), &query, &ontology);
        let without = topic_score(&shared("Dati denunciati"), &query, &ontology);
        assert!(with_synonym > without);
    }

    proptest! {
        #[test]
        fn prop_synonym_in_title_strictly_outscores(
            synonym_index in 0usize..16,
            suffix in "[0-9 ]{0,10}",
            described in any::<bool>(),
            tagged in any::<bool>(),
            structured in any::<bool>(),
        ) {
            let ontology = Ontology::italian_default();
            let query = reati_milano();
            let terms = query.topic.terms();
            let synonym = terms[synonym_index % terms.len()];

            let build = |title: String| {
                let mut dataset = CatalogDataset::new("d", title).with_publisher("ISTAT");
                if described {
                    dataset = dataset.with_description(format!("{} per quartiere", synonym));
                }
                if tagged {
                    dataset = dataset.with_tag(synonym);
                }
                if structured {
                    dataset = dataset.with_resource(Resource::new("https://x/y.csv"));
                }
                dataset
            };

            let a = build(format!("{} {}", synonym, suffix));
            let b = build(format!("Dati {}", suffix));
            prop_assert!(topic_score(&a, &query, &ontology) > topic_score(&b, &query, &ontology));
        }

        #[test]
        fn prop_adding_topic_term_never_lowers_score(
            title in "[a-z ]{0,20}",
            description in "[a-z ]{0,30}",
            field in 0usize..4,
        ) {
            let ontology = Ontology::italian_default();
            let query = reati_milano();
            let base = CatalogDataset::new("d", title.clone()).with_description(description.clone());
            let before = topic_score(&base, &query, &ontology);

            let enriched = match field {
                0 => CatalogDataset::new("d", format!("{} reati", title)).with_description(description),
                1 => CatalogDataset::new("d", title).with_description(format!("{} reati", description)),
                2 => base.clone().with_tag("reati"),
                _ => base.clone().with_group("reati"),
            };
            prop_assert!(topic_score(&enriched, &query, &ontology) >= before);
        }
    }
}

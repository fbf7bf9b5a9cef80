//! Integration tests for the full discovery pipeline.
//!
//! These run question → variants → search → fallback → sampling → relevance
//! against in-memory catalogs and resource hosts.

use discovery::{
    testing::{MockCatalog, MockFetcher, MockRemoteExtractor},
    CatalogDataset, Discovery, DiscoveryConfig, DiscoveryRoute, RemoteEntities, Resource,
    SearchPage, SearchRequest, UrlValidator, ValidatedFetcher,
};

const QUESTION: &str = "Confronta i reati a Milano negli ultimi 5 anni";

const MILANO_CSV: &str = "comune;anno;reati_denunciati\n\
                          Milano;2023;1200\n\
                          Roma;2023;1500\n\
                          Milano;2019;1100\n";

fn config() -> DiscoveryConfig {
    DiscoveryConfig::default().with_current_year(2026)
}

fn reati_dataset(id: &str, url: &str) -> CatalogDataset {
    CatalogDataset::new(id, "Reati denunciati per comune")
        .with_publisher("ISTAT")
        .with_resource(Resource::new(url).with_format("CSV"))
}

fn all_rows_mention(rows: &[discovery::Record], token: &str) -> bool {
    rows.iter().all(|row| {
        row.values()
            .any(|v| v.to_lowercase().contains(&token.to_lowercase()))
    })
}

#[tokio::test]
async fn test_end_to_end_milano_reati() {
    let catalog = MockCatalog::new().with_default(SearchPage::new(
        1,
        vec![reati_dataset("reati-comuni", "https://dati.example.it/reati.csv")],
    ));
    let fetcher = MockFetcher::new().with_body("https://dati.example.it/reati.csv", MILANO_CSV);
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert!(result.has_real_data);
    assert!(!result.rows.is_empty() && result.rows.len() <= 20);
    assert!(all_rows_mention(&result.rows, "milano"));
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.query.year_range(), Some((2022, 2026)));

    match &result.route {
        DiscoveryRoute::Targeted { priority, .. } => assert_eq!(*priority, 1),
        other => panic!("expected a targeted route, got {:?}", other),
    }
    let source = result.source.as_ref().unwrap();
    assert_eq!(source.dataset_id, "reati-comuni");
    assert_eq!(source.digest.len(), 64);
    assert!(result.datasets[0].accepted);
}

#[tokio::test]
async fn test_priority_one_variant_carries_the_city() {
    let discovery = Discovery::new(MockCatalog::new(), MockFetcher::new()).with_config(config());

    let query = discovery.extract(QUESTION).await;
    let variants = discovery.variants(&query);

    let first = variants.iter().find(|v| v.priority == 1).unwrap();
    assert!(first.request.text.contains("Milano"));
    assert!(first.request.filter.is_some());
}

#[tokio::test]
async fn test_empty_catalog_reports_no_data() {
    let catalog = MockCatalog::new();
    let discovery = Discovery::new(catalog.clone(), MockFetcher::new()).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert!(!result.has_real_data);
    assert!(result.rows.is_empty());
    assert!(result.datasets.is_empty());
    assert_eq!(result.route, DiscoveryRoute::NotFound);

    // Every variant, then exactly one broad scan with the larger row cap.
    let calls = catalog.calls();
    let (last, rows) = calls.last().unwrap();
    assert_eq!(last.text, "Milano");
    assert_eq!(*rows, 100);
    assert_eq!(calls.iter().filter(|(_, rows)| *rows == 100).count(), 1);
}

#[tokio::test]
async fn test_topic_without_place_has_no_broad_scan() {
    let catalog = MockCatalog::new();
    let discovery = Discovery::new(catalog.clone(), MockFetcher::new()).with_config(config());

    let result = discovery
        .run("Quanti reati negli ultimi 3 anni?")
        .await
        .unwrap();

    assert!(!result.has_real_data);
    assert!(catalog.calls().iter().all(|(_, rows)| *rows == 50));
}

#[tokio::test]
async fn test_broad_fallback_ranks_by_topic() {
    let catalog = MockCatalog::new().with_page(
        SearchRequest::new("Milano"),
        SearchPage::new(
            3,
            vec![
                CatalogDataset::new("parchi", "Parchi di Milano")
                    .with_resource(Resource::new("https://x/parchi.csv")),
                CatalogDataset::new("criminalita", "Criminalità a Milano")
                    .with_tag("sicurezza")
                    .with_resource(Resource::new("https://x/crim.csv")),
                CatalogDataset::new("orari", "Orari uffici"),
            ],
        ),
    );
    let fetcher = MockFetcher::new()
        .with_body("https://x/parchi.csv", "nome;anno\nSempione;2023\n")
        .with_body("https://x/crim.csv", MILANO_CSV);
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert!(result.has_real_data);
    assert_eq!(
        result.route,
        DiscoveryRoute::BroadFallback {
            scanned: 3,
            kept: 1
        }
    );
    assert_eq!(result.datasets.len(), 1);
    assert_eq!(result.datasets[0].id, "criminalita");
    assert!(all_rows_mention(&result.rows, "milano"));
}

#[tokio::test]
async fn test_mismatched_dataset_is_skipped_for_the_next() {
    let catalog = MockCatalog::new().with_default(SearchPage::new(
        2,
        vec![
            CatalogDataset::new("roma", "Reati in Italia")
                .with_resource(Resource::new("https://x/roma.csv")),
            reati_dataset("milano", "https://x/milano.csv"),
        ],
    ));
    let fetcher = MockFetcher::new()
        .with_body("https://x/roma.csv", "comune,anno\nRoma,2023\nNapoli,2024\n")
        .with_body("https://x/milano.csv", MILANO_CSV);
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert!(result.has_real_data);
    assert!(!result.datasets[0].accepted);
    assert!(result.datasets[1].accepted);
    assert_eq!(result.source.unwrap().resource_url, "https://x/milano.csv");
}

#[tokio::test]
async fn test_json_resource_tried_before_csv() {
    let dataset = CatalogDataset::new("d", "Reati Milano")
        .with_resource(Resource::new("https://x/reati.csv"))
        .with_resource(Resource::new("https://x/reati.json"));
    let catalog = MockCatalog::new().with_default(SearchPage::new(1, vec![dataset]));
    let fetcher = MockFetcher::new()
        .with_body("https://x/reati.csv", MILANO_CSV)
        .with_body(
            "https://x/reati.json",
            r#"{"result":{"records":[{"comune":"Milano","anno":2024,"totale":900}]}}"#,
        );
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0]["anno"], "2024");
    assert!(result.source.unwrap().provenance.contains("result.records"));
}

#[tokio::test]
async fn test_blocked_resource_host_falls_through() {
    let dataset = CatalogDataset::new("d", "Reati Milano")
        .with_resource(Resource::new("http://169.254.169.254/latest.json"))
        .with_resource(Resource::new("https://x/reati.csv"));
    let catalog = MockCatalog::new().with_default(SearchPage::new(1, vec![dataset]));
    let inner = MockFetcher::new()
        .with_body("http://169.254.169.254/latest.json", r#"[{"comune":"Milano","anno":2024}]"#)
        .with_body("https://x/reati.csv", MILANO_CSV);
    let fetcher = ValidatedFetcher::with_validator(inner.clone(), UrlValidator::new().allow_host("x"));
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();

    assert!(result.has_real_data);
    assert_eq!(result.source.unwrap().resource_url, "https://x/reati.csv");
    assert_eq!(inner.fetch_count(), 1);
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let build = || {
        let catalog = MockCatalog::new().with_default(SearchPage::new(
            1,
            vec![reati_dataset("d", "https://x/reati.csv")],
        ));
        let fetcher = MockFetcher::new().with_body("https://x/reati.csv", MILANO_CSV);
        Discovery::new(catalog, fetcher).with_config(config())
    };

    let first = build().run(QUESTION).await.unwrap();
    let second = build().run(QUESTION).await.unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(first.route, second.route);
    assert_eq!(
        first.source.unwrap().digest,
        second.source.unwrap().digest
    );
}

#[tokio::test]
async fn test_remote_extractor_answer_is_used() {
    let catalog = MockCatalog::new();
    let remote = MockRemoteExtractor::returning(RemoteEntities {
        city: Some("Roma".into()),
        years: vec![2020],
        topic: Some("popolazione".into()),
        ..Default::default()
    });
    let discovery = Discovery::new(catalog.clone(), MockFetcher::new())
        .with_remote_extractor(remote.clone())
        .with_config(config());

    let result = discovery.run("quanti abitanti?").await.unwrap();

    assert_eq!(remote.call_count(), 1);
    assert_eq!(result.query.geography.city.as_deref(), Some("Roma"));
    assert_eq!(result.query.geography.region.as_deref(), Some("Lazio"));
    assert_eq!(result.query.topic.canonical, "popolazione");
    assert!(catalog.calls().iter().any(|(r, _)| r.text.contains("Roma")));
}

#[tokio::test]
async fn test_result_serializes_for_consumers() {
    let catalog = MockCatalog::new().with_default(SearchPage::new(
        1,
        vec![reati_dataset("d", "https://x/reati.csv")],
    ));
    let fetcher = MockFetcher::new().with_body("https://x/reati.csv", MILANO_CSV);
    let discovery = Discovery::new(catalog, fetcher).with_config(config());

    let result = discovery.run(QUESTION).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["hasRealData"], true);
    assert_eq!(json["route"]["kind"], "targeted");
    assert_eq!(json["rows"][0]["comune"], "Milano");
    assert_eq!(json["datasets"][0]["formats"][0], "CSV");
}

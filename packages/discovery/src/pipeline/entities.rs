//! Entity extraction: question → normalized (geography, topic, years).
//!
//! The remote extractor is tried first; whatever it leaves empty (or all of
//! it, on failure) is filled from local heuristics: a word-boundary gazetteer
//! match, explicit 4-digit years, and relative phrases such as
//! "negli ultimi 5 anni" or "dal 2018 al 2022".

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::gazetteer::{Gazetteer, GazetteerMatcher};
use crate::ontology::Ontology;
use crate::text::year_tokens;
use crate::traits::extractor::{RemoteEntities, RemoteExtractor};
use crate::types::query::{is_valid_year, Geography, NormalizedQuery, Topic};

/// Longest relative window we expand ("ultimi 50 anni").
const MAX_RELATIVE_YEARS: i32 = 50;

fn last_n_years_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:ultimi|last|past)\s+(\d{1,2}|due|tre|quattro|cinque|sei|sette|otto|nove|dieci|two|three|four|five|six|seven|eight|nine|ten)\s+(?:anni|years)\b",
        )
        .expect("static pattern")
    })
}

fn year_span_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:dal|from|tra il|between)\s+(\d{4})\s+(?:al|to|e il|and)\s+(\d{4})\b")
            .expect("static pattern")
    })
}

fn count_word(word: &str) -> Option<i32> {
    let n = match word.to_lowercase().as_str() {
        "due" | "two" => 2,
        "tre" | "three" => 3,
        "quattro" | "four" => 4,
        "cinque" | "five" => 5,
        "sei" | "six" => 6,
        "sette" | "seven" => 7,
        "otto" | "eight" => 8,
        "nove" | "nine" => 9,
        "dieci" | "ten" => 10,
        digits => digits.parse().ok()?,
    };
    Some(n)
}

/// Years named or implied by the question text.
pub fn extract_years(question: &str, current_year: i32) -> BTreeSet<i32> {
    let mut years: BTreeSet<i32> = year_tokens(question).into_iter().collect();

    for cap in last_n_years_pattern().captures_iter(question) {
        if let Some(n) = cap.get(1).and_then(|m| count_word(m.as_str())) {
            if (1..=MAX_RELATIVE_YEARS).contains(&n) {
                years.extend((current_year - n + 1)..=current_year);
            }
        }
    }

    for cap in year_span_pattern().captures_iter(question) {
        let bounds = (
            cap.get(1).and_then(|m| m.as_str().parse::<i32>().ok()),
            cap.get(2).and_then(|m| m.as_str().parse::<i32>().ok()),
        );
        if let (Some(a), Some(b)) = bounds {
            let (start, end) = (a.min(b), a.max(b));
            if end - start <= MAX_RELATIVE_YEARS {
                years.extend(start..=end);
            }
        }
    }

    years.retain(|y| is_valid_year(*y));
    years
}

/// Local, deterministic extraction strategy.
pub struct HeuristicExtractor<'k> {
    ontology: &'k Ontology,
    gazetteer: &'k Gazetteer,
    matcher: &'k GazetteerMatcher,
    current_year: i32,
}

impl<'k> HeuristicExtractor<'k> {
    pub fn new(
        ontology: &'k Ontology,
        gazetteer: &'k Gazetteer,
        matcher: &'k GazetteerMatcher,
        current_year: i32,
    ) -> Self {
        Self {
            ontology,
            gazetteer,
            matcher,
            current_year,
        }
    }

    pub fn extract(&self, question: &str) -> NormalizedQuery {
        let geography = match self.matcher.find_city(self.gazetteer, question) {
            Some(municipality) => municipality.geography(),
            None => match self.matcher.find_region(self.gazetteer, question) {
                Some(region) => Geography::default().with_region(region),
                None => Geography::default(),
            },
        };

        let topic = self
            .ontology
            .detect(question)
            .unwrap_or_else(Topic::generic);

        NormalizedQuery::new(
            geography,
            extract_years(question, self.current_year),
            topic,
        )
    }
}

/// Merge remote fields over the local result.
///
/// Remote values win when present. Province and region are completed from the
/// gazetteer entry of the chosen city, and from the local result only when it
/// agrees on the city.
pub fn merge(
    remote: RemoteEntities,
    local: NormalizedQuery,
    ontology: &Ontology,
    gazetteer: &Gazetteer,
) -> NormalizedQuery {
    let remote = remote.sanitized();
    let local_geo = local.geography;

    let city = match &remote.city {
        Some(name) => Some(
            gazetteer
                .municipality(name)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| name.clone()),
        ),
        None => local_geo.city.clone(),
    };
    let known = city.as_deref().and_then(|c| gazetteer.municipality(c));
    let local_agrees = local_geo.city.is_none() || local_geo.city == city;

    let province = remote
        .province
        .clone()
        .or_else(|| known.map(|m| m.province.clone()))
        .or_else(|| local_agrees.then(|| local_geo.province.clone()).flatten());
    let region = remote
        .region
        .clone()
        .map(|r| gazetteer.region(&r).map(String::from).unwrap_or(r))
        .or_else(|| known.map(|m| m.region.clone()))
        .or_else(|| local_agrees.then(|| local_geo.region.clone()).flatten());

    let geography = Geography {
        city,
        province,
        region,
        nation: local_geo.nation,
    };

    let years: Vec<i32> = if remote.years.is_empty() {
        local.years.into_iter().collect()
    } else {
        remote.years
    };

    let topic = match remote.topic {
        Some(term) => ontology.canonicalize(&term).with_synonyms(remote.synonyms),
        None => local.topic,
    };

    NormalizedQuery::new(geography, years, topic)
}

/// Remote extraction with heuristic fallback. Never fails.
pub async fn extract_entities(
    question: &str,
    remote: Option<&dyn RemoteExtractor>,
    heuristics: &HeuristicExtractor<'_>,
) -> NormalizedQuery {
    let local = heuristics.extract(question);

    let Some(remote) = remote else {
        debug!(topic = %local.topic.canonical, "Heuristic extraction only");
        return local;
    };

    match remote.extract(question).await {
        Ok(entities) => {
            let merged = merge(entities, local, heuristics.ontology, heuristics.gazetteer);
            debug!(
                topic = %merged.topic.canonical,
                place = ?merged.geography.token(),
                years = merged.years.len(),
                "Remote extraction merged"
            );
            merged
        }
        Err(e) => {
            warn!(error = %e, "Remote extraction failed, using heuristics");
            local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRemoteExtractor;
    use proptest::prelude::*;

    fn years(v: &BTreeSet<i32>) -> Vec<i32> {
        v.iter().copied().collect()
    }

    #[test]
    fn test_last_n_years_expansion() {
        let y = extract_years("Confronta i reati a Milano negli ultimi 5 anni", 2026);
        assert_eq!(years(&y), vec![2022, 2023, 2024, 2025, 2026]);

        let y = extract_years("crime in Rome over the last three years", 2024);
        assert_eq!(years(&y), vec![2022, 2023, 2024]);
    }

    #[test]
    fn test_explicit_years_and_spans() {
        let y = extract_years("popolazione nel 2019 e nel 2021", 2026);
        assert_eq!(years(&y), vec![2019, 2021]);

        let y = extract_years("rifiuti dal 2022 al 2020", 2026);
        assert_eq!(years(&y), vec![2020, 2021, 2022]);

        assert!(extract_years("quanti abitanti ha Bari?", 2026).is_empty());
    }

    #[test]
    fn test_heuristic_extraction() {
        let ontology = Ontology::italian_default();
        let gazetteer = Gazetteer::italian_default();
        let matcher = gazetteer.matcher();
        let heuristics = HeuristicExtractor::new(&ontology, &gazetteer, &matcher, 2026);

        let q = heuristics.extract("Confronta i reati a Milano negli ultimi 5 anni");
        assert_eq!(q.geography.city.as_deref(), Some("Milano"));
        assert_eq!(q.geography.region.as_deref(), Some("Lombardia"));
        assert_eq!(q.topic.canonical, "reati");
        assert!(q.topic.synonyms.contains("crimini"));
        assert_eq!(q.year_range(), Some((2022, 2026)));

        let q = heuristics.extract("raccolta differenziata in Toscana");
        assert_eq!(q.geography.city, None);
        assert_eq!(q.geography.region.as_deref(), Some("Toscana"));
        assert_eq!(q.topic.canonical, "rifiuti");

        let q = heuristics.extract("Dimmi qualcosa");
        assert!(q.topic.is_generic());
        assert!(!q.geography.is_known());
    }

    #[test]
    fn test_merge_remote_wins_and_gaps_filled() {
        let ontology = Ontology::italian_default();
        let gazetteer = Gazetteer::italian_default();
        let local = NormalizedQuery::new(
            gazetteer.municipality("Milano").unwrap().geography(),
            [2022, 2023],
            ontology.canonicalize("reati"),
        );
        let remote = RemoteEntities {
            city: Some("milano".into()),
            topic: Some("delitti".into()),
            synonyms: vec!["rapine".into()],
            ..Default::default()
        };

        let merged = merge(remote, local, &ontology, &gazetteer);
        assert_eq!(merged.geography.city.as_deref(), Some("Milano"));
        assert_eq!(merged.geography.region.as_deref(), Some("Lombardia"));
        assert_eq!(merged.topic.canonical, "reati");
        assert!(merged.topic.synonyms.contains("rapine"));
        assert_eq!(merged.year_range(), Some((2022, 2023)));
    }

    #[test]
    fn test_merge_does_not_mix_disagreeing_places() {
        let ontology = Ontology::italian_default();
        let gazetteer = Gazetteer::italian_default();
        let local = NormalizedQuery::new(
            Geography::city("Atlantide").with_region("Nowhere"),
            [],
            Topic::generic(),
        );
        let remote = RemoteEntities {
            city: Some("Paperopoli".into()),
            ..Default::default()
        };

        let merged = merge(remote, local, &ontology, &gazetteer);
        assert_eq!(merged.geography.city.as_deref(), Some("Paperopoli"));
        assert_eq!(merged.geography.region, None);
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_to_heuristics() {
        let ontology = Ontology::italian_default();
        let gazetteer = Gazetteer::italian_default();
        let matcher = gazetteer.matcher();
        let heuristics = HeuristicExtractor::new(&ontology, &gazetteer, &matcher, 2026);
        let remote = MockRemoteExtractor::failing("rate limited");

        let q = extract_entities(
            "reati a Roma nel 2021",
            Some(&remote as &dyn RemoteExtractor),
            &heuristics,
        )
        .await;

        assert_eq!(remote.call_count(), 1);
        assert_eq!(q.geography.city.as_deref(), Some("Roma"));
        assert_eq!(q.years.iter().copied().collect::<Vec<_>>(), vec![2021]);
    }

    #[tokio::test]
    async fn test_remote_unmapped_topic_passes_through() {
        let ontology = Ontology::italian_default();
        let gazetteer = Gazetteer::italian_default();
        let matcher = gazetteer.matcher();
        let heuristics = HeuristicExtractor::new(&ontology, &gazetteer, &matcher, 2026);
        let remote = MockRemoteExtractor::returning(RemoteEntities {
            topic: Some("Biblioteche".into()),
            years: vec![2020],
            ..Default::default()
        });

        let q = extract_entities("biblioteche a Bologna", Some(&remote as &dyn RemoteExtractor), &heuristics).await;
        assert_eq!(q.topic.canonical, "biblioteche");
        assert!(q.topic.synonyms.is_empty());
        assert_eq!(q.geography.city.as_deref(), Some("Bologna"));
    }

    proptest! {
        #[test]
        fn prop_last_n_years_ends_at_current_year(n in 1i32..=50, current in 1960i32..=2099) {
            let y = extract_years(&format!("negli ultimi {} anni", n), current);
            prop_assert_eq!(y.len() as i32, n);
            prop_assert_eq!(y.iter().next_back().copied(), Some(current));
            prop_assert_eq!(y.iter().next().copied(), Some(current - n + 1));
        }

        #[test]
        fn prop_years_are_always_valid(text in "[a-z0-9 ]{0,60}", current in 1900i32..=2099) {
            prop_assert!(extract_years(&text, current).iter().all(|y| is_valid_year(*y)));
        }
    }
}

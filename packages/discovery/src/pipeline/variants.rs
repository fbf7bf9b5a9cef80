//! Query variant generation.
//!
//! Variants run most specific first. Each family is only emitted when it can
//! say something the later ones cannot:
//!
//! 1. Publisher-name filter for a known municipality (plus the topic's
//!    national publishers), query text bound to the place.
//! 2. Organization-slug filter for the municipality, topic terms only.
//! 3. Organization-slug filter for the topic's national publishers.
//! 4. Structured-format filter.
//! 5. Universal: topic terms and place, no filter.

use std::collections::HashSet;

use crate::gazetteer::Gazetteer;
use crate::ontology::Ontology;
use crate::types::query::{Geography, Topic};
use crate::types::variant::{QueryVariant, SearchRequest};

/// Relevance first, then freshness.
pub const DEFAULT_SORT: &str = "score desc, metadata_modified desc";

const PUBLISHER_FIELD: &str = "holder_name";
const ORGANIZATION_FIELD: &str = "organization";
const FORMAT_FILTER: &str = "res_format:(CSV OR JSON)";

fn quote(term: &str) -> String {
    let escaped = term.replace('"', "\\\"");
    if escaped.contains(char::is_whitespace) || escaped.contains('\'') {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

/// `reati` or `(reati OR crimini OR "raccolta differenziata")`.
fn topic_expression(topic: &Topic) -> Option<String> {
    let terms: Vec<String> = topic.terms().into_iter().map(quote).collect();
    match terms.len() {
        0 => None,
        1 => terms.into_iter().next(),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}

fn join_text(parts: &[Option<String>]) -> Option<String> {
    let text = parts
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// `field:("a" OR "b")`, always quoted: publisher names are matched exactly.
fn exact_filter(field: &str, values: &[&str]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let values: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect();
    Some(format!("{}:({})", field, values.join(" OR ")))
}

fn slug_filter(field: &str, slugs: &[&str]) -> Option<String> {
    if slugs.is_empty() {
        return None;
    }
    Some(format!("{}:({})", field, slugs.join(" OR ")))
}

fn dedup_preserving_order<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|v| seen.insert(*v)).collect()
}

/// Build the ordered, de-duplicated variant list for a topic and place.
///
/// Returns an empty list when there is neither a topic nor a place to search on.
pub fn build_variants(
    topic: &Topic,
    geography: &Geography,
    ontology: &Ontology,
    gazetteer: &Gazetteer,
) -> Vec<QueryVariant> {
    let topic_expr = topic_expression(topic);
    let place = geography.token().map(quote);
    let municipality = geography.city.as_deref().and_then(|c| gazetteer.municipality(c));

    let Some(bound_text) = join_text(&[topic_expr.clone(), place.clone()]) else {
        return Vec::new();
    };

    let mut variants = Vec::new();

    if let Some(municipality) = municipality {
        let publishers = dedup_preserving_order(
            municipality
                .publishers
                .iter()
                .chain(ontology.publishers_for(topic))
                .map(String::as_str),
        );
        if let Some(filter) = exact_filter(PUBLISHER_FIELD, &publishers) {
            variants.push(
                QueryVariant::new(
                    "municipal-publisher",
                    1,
                    SearchRequest::new(&bound_text)
                        .with_filter(filter)
                        .with_sort(DEFAULT_SORT),
                )
                .with_rationale(format!(
                    "publishers authoritative for {}",
                    municipality.name
                )),
            );
        }

        let orgs: Vec<&str> = municipality.organizations.iter().map(String::as_str).collect();
        if let (Some(filter), Some(text)) = (
            slug_filter(ORGANIZATION_FIELD, &orgs),
            topic_expr.clone(),
        ) {
            variants.push(
                QueryVariant::new(
                    "municipal-organization",
                    2,
                    SearchRequest::new(text)
                        .with_filter(filter)
                        .with_sort(DEFAULT_SORT),
                )
                .with_rationale(format!("catalog organization of {}", municipality.name)),
            );
        }
    }

    if !topic.is_generic() {
        let orgs: Vec<&str> = ontology
            .organizations_for(topic)
            .iter()
            .map(String::as_str)
            .collect();
        if let Some(filter) = slug_filter(ORGANIZATION_FIELD, &orgs) {
            variants.push(
                QueryVariant::new(
                    "national-publisher",
                    3,
                    SearchRequest::new(&bound_text)
                        .with_filter(filter)
                        .with_sort(DEFAULT_SORT),
                )
                .with_rationale(format!("national publishers for {}", topic.canonical)),
            );
        }
    }

    variants.push(
        QueryVariant::new(
            "structured-format",
            4,
            SearchRequest::new(&bound_text)
                .with_filter(FORMAT_FILTER)
                .with_sort(DEFAULT_SORT),
        )
        .with_rationale("machine-readable resources only"),
    );

    variants.push(
        QueryVariant::new(
            "universal",
            5,
            SearchRequest::new(&bound_text).with_sort(DEFAULT_SORT),
        )
        .with_rationale("unfiltered"),
    );

    let mut seen = HashSet::new();
    variants.retain(|v| {
        let (text, filter) = v.request.dedup_key();
        seen.insert((text.to_string(), filter.map(String::from)))
    });
    variants.sort_by_key(|v| v.priority);
    variants
}

//! Topic ontology: closed synonym clusters plus the publishers that are
//! authoritative for each topic domain.
//!
//! The ontology is an explicit value handed to the extractor, the variant
//! builder and the fallback scanner, so different topic domains can run side
//! by side.

use serde::{Deserialize, Serialize};

use crate::text::contains_term;
use crate::types::query::Topic;

/// One synonym cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub canonical: String,

    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Publisher display names authoritative for this domain.
    #[serde(default)]
    pub publishers: Vec<String>,

    /// Catalog organization slugs of the same publishers.
    #[serde(default)]
    pub organizations: Vec<String>,
}

impl TopicEntry {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into().to_lowercase(),
            synonyms: Vec::new(),
            publishers: Vec::new(),
            organizations: Vec::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms
            .extend(synonyms.iter().map(|s| s.to_lowercase()));
        self
    }

    pub fn with_publishers(mut self, publishers: &[&str]) -> Self {
        self.publishers.extend(publishers.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_organizations(mut self, organizations: &[&str]) -> Self {
        self.organizations
            .extend(organizations.iter().map(|s| s.to_string()));
        self
    }

    /// Canonical name and synonyms.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }

    fn knows(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.terms().any(|t| t == term)
    }

    fn to_topic(&self) -> Topic {
        Topic::new(&self.canonical).with_synonyms(self.synonyms.iter().cloned())
    }
}

/// The closed set of known topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ontology {
    pub topics: Vec<TopicEntry>,

    /// National publishers used when a topic has none of its own.
    #[serde(default)]
    pub national_publishers: Vec<String>,

    #[serde(default)]
    pub national_organizations: Vec<String>,
}

impl Default for Ontology {
    fn default() -> Self {
        Self::italian_default()
    }
}

impl Ontology {
    /// Load from a JSON document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Built-in clusters for common Italian public-data questions.
    pub fn italian_default() -> Self {
        Self {
            topics: vec![
                TopicEntry::new("reati")
                    .with_synonyms(&["delitti", "criminalità", "crimini", "denunce", "furti"])
                    .with_publishers(&["Ministero dell'Interno", "ISTAT"])
                    .with_organizations(&["ministero-dell-interno", "istat"]),
                TopicEntry::new("popolazione")
                    .with_synonyms(&["residenti", "abitanti", "demografia", "anagrafe"])
                    .with_publishers(&["ISTAT"])
                    .with_organizations(&["istat"]),
                TopicEntry::new("turismo")
                    .with_synonyms(&["presenze turistiche", "arrivi turistici", "strutture ricettive"])
                    .with_publishers(&["ISTAT"])
                    .with_organizations(&["istat"]),
                TopicEntry::new("rifiuti")
                    .with_synonyms(&["raccolta differenziata", "igiene urbana"])
                    .with_publishers(&["ISPRA"])
                    .with_organizations(&["ispra"]),
                TopicEntry::new("qualità dell'aria")
                    .with_synonyms(&["inquinamento", "pm10", "smog", "emissioni"])
                    .with_publishers(&["ISPRA", "ARPA"])
                    .with_organizations(&["ispra"]),
                TopicEntry::new("incidenti stradali")
                    .with_synonyms(&["sinistri stradali", "incidentalità", "incidenti"])
                    .with_publishers(&["ISTAT", "ACI"])
                    .with_organizations(&["istat"]),
                TopicEntry::new("scuole")
                    .with_synonyms(&["istruzione", "studenti", "alunni", "scuola"])
                    .with_publishers(&["Ministero dell'Istruzione e del Merito"])
                    .with_organizations(&["miur"]),
            ],
            national_publishers: vec!["ISTAT".to_string()],
            national_organizations: vec!["istat".to_string()],
        }
    }

    /// Map a free-form topic onto its cluster.
    ///
    /// Unknown topics pass through as their own canonical with no synonyms.
    pub fn canonicalize(&self, term: &str) -> Topic {
        match self.topics.iter().find(|e| e.knows(term)) {
            Some(entry) => entry.to_topic(),
            None => Topic::new(term),
        }
    }

    /// First cluster (declaration order) with a term occurring in `text`.
    pub fn detect(&self, text: &str) -> Option<Topic> {
        self.topics
            .iter()
            .find(|e| e.terms().any(|t| contains_term(text, t)))
            .map(TopicEntry::to_topic)
    }

    /// The cluster behind a normalized topic, if it is a known one.
    pub fn entry(&self, topic: &Topic) -> Option<&TopicEntry> {
        self.topics.iter().find(|e| e.canonical == topic.canonical)
    }

    /// Authoritative publisher names for a topic, national defaults otherwise.
    pub fn publishers_for(&self, topic: &Topic) -> &[String] {
        match self.entry(topic) {
            Some(entry) if !entry.publishers.is_empty() => &entry.publishers,
            _ => &self.national_publishers,
        }
    }

    /// Authoritative organization slugs for a topic, national defaults otherwise.
    pub fn organizations_for(&self, topic: &Topic) -> &[String] {
        match self.entry(topic) {
            Some(entry) if !entry.organizations.is_empty() => &entry.organizations,
            _ => &self.national_organizations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_synonym_cluster() {
        let ontology = Ontology::italian_default();
        let topic = ontology.canonicalize("Delitti");
        assert_eq!(topic.canonical, "reati");
        assert!(topic.synonyms.contains("criminalità"));
        assert!(topic.synonyms.contains("crimini"));
    }

    #[test]
    fn test_unknown_topic_passes_through() {
        let ontology = Ontology::italian_default();
        let topic = ontology.canonicalize("Biblioteche");
        assert_eq!(topic.canonical, "biblioteche");
        assert!(topic.synonyms.is_empty());
    }

    #[test]
    fn test_detect_in_question() {
        let ontology = Ontology::italian_default();
        let topic = ontology
            .detect("Confronta i reati a Milano negli ultimi 5 anni")
            .unwrap();
        assert_eq!(topic.canonical, "reati");

        assert!(ontology.detect("Quanti musei ci sono?").is_none());
    }

    #[test]
    fn test_publishers_fall_back_to_national() {
        let ontology = Ontology::italian_default();
        let known = ontology.canonicalize("reati");
        assert!(ontology
            .publishers_for(&known)
            .contains(&"Ministero dell'Interno".to_string()));

        let unknown = Topic::new("musei");
        assert_eq!(ontology.organizations_for(&unknown), &["istat".to_string()]);
    }

    #[test]
    fn test_ontology_roundtrips_through_json() {
        let json = r#"{"topics":[{"canonical":"energia","synonyms":["elettricità"]}]}"#;
        let ontology = Ontology::from_json(json).unwrap();
        assert_eq!(ontology.canonicalize("elettricità").canonical, "energia");
        assert!(ontology.national_publishers.is_empty());
    }
}

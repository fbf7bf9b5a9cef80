//! The normalized (geography, topic, years) triple extracted from a question.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Canonical topic used when nothing topical was recognized.
pub const GENERIC_TOPIC: &str = "generic";

/// Default nation for every query.
pub const DEFAULT_NATION: &str = "Italia";

/// Inclusive bounds for a plausible 4-digit year in the data.
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2099;

/// Whether a number is a year we are willing to reason about.
pub fn is_valid_year(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Where the question is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geography {
    pub city: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    pub nation: String,
}

impl Default for Geography {
    fn default() -> Self {
        Self {
            city: None,
            province: None,
            region: None,
            nation: DEFAULT_NATION.to_string(),
        }
    }
}

impl Geography {
    /// Geography for a municipality.
    pub fn city(name: impl Into<String>) -> Self {
        Self {
            city: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// The most specific sub-national place name, if any.
    ///
    /// The nation alone does not count: every query is about Italy.
    pub fn token(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.province.as_deref())
            .or(self.region.as_deref())
    }

    /// True when some sub-national place is known.
    pub fn is_known(&self) -> bool {
        self.token().is_some()
    }
}

/// Canonical topic plus the synonym cluster it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub canonical: String,
    #[serde(default)]
    pub synonyms: BTreeSet<String>,
}

impl Default for Topic {
    fn default() -> Self {
        Self::generic()
    }
}

impl Topic {
    /// A topic with no synonyms. Empty input collapses to the generic sentinel.
    pub fn new(canonical: impl Into<String>) -> Self {
        let canonical = canonical.into().trim().to_lowercase();
        if canonical.is_empty() {
            return Self::generic();
        }
        Self {
            canonical,
            synonyms: BTreeSet::new(),
        }
    }

    pub fn generic() -> Self {
        Self {
            canonical: GENERIC_TOPIC.to_string(),
            synonyms: BTreeSet::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for s in synonyms {
            let s = s.into().trim().to_lowercase();
            if !s.is_empty() {
                self.synonyms.insert(s);
            }
        }
        self
    }

    pub fn is_generic(&self) -> bool {
        self.canonical == GENERIC_TOPIC
    }

    /// Canonical first, then the remaining synonyms in sorted order.
    ///
    /// The generic sentinel contributes no search terms.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms = Vec::with_capacity(self.synonyms.len() + 1);
        if !self.is_generic() {
            terms.push(self.canonical.as_str());
        }
        terms.extend(
            self.synonyms
                .iter()
                .map(String::as_str)
                .filter(|s| *s != self.canonical && *s != GENERIC_TOPIC),
        );
        terms
    }
}

/// Output of the entity extractor; read-only for the rest of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedQuery {
    pub geography: Geography,
    pub years: BTreeSet<i32>,
    pub topic: Topic,
}

impl NormalizedQuery {
    /// Build a query, dropping implausible years.
    pub fn new(
        geography: Geography,
        years: impl IntoIterator<Item = i32>,
        topic: Topic,
    ) -> Self {
        Self {
            geography,
            years: years.into_iter().filter(|y| is_valid_year(*y)).collect(),
            topic,
        }
    }

    /// `[first, last]` of the year set, or `None` when no years were asked for.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let first = *self.years.iter().next()?;
        let last = *self.years.iter().next_back()?;
        Some((first, last))
    }

    /// Whether `year` falls inside the requested window (always true without one).
    pub fn year_in_range(&self, year: i32) -> bool {
        match self.year_range() {
            Some((start, end)) => (start..=end).contains(&year),
            None => true,
        }
    }
}

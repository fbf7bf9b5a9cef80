//! Layered geography/year relevance filter over a sample.
//!
//! 1. Rows mentioning the place: keep only those, provided at least one of
//!    them has a year in range.
//! 2. No row mentions the place, but the dataset does (metadata or an
//!    authoritative host): keep the whole sample if a year is in range in
//!    the rows or the dataset metadata.
//! 3. No place known: keep the whole sample on the year test alone.

use crate::gazetteer::Gazetteer;
use crate::text::{contains_ci, year_tokens};
use crate::types::config::YearMatch;
use crate::types::dataset::{CatalogDataset, Resource};
use crate::types::query::NormalizedQuery;
use crate::types::sample::{record_text, Rejection, Record, Sample};

/// Column names that hold a year or period in [`YearMatch::NamedColumn`] mode.
pub const YEAR_COLUMNS: &[&str] = &[
    "anno",
    "year",
    "anno_riferimento",
    "anno di riferimento",
    "periodo",
    "period",
    "data",
    "date",
];

fn is_year_column(name: &str) -> bool {
    let name = name.trim().to_lowercase();
    YEAR_COLUMNS.iter().any(|c| name == *c || name.starts_with(&format!("{}_", c)))
}

pub struct RelevanceFilter<'a> {
    query: &'a NormalizedQuery,
    gazetteer: &'a Gazetteer,
    year_match: YearMatch,
    max_rows: usize,
}

impl<'a> RelevanceFilter<'a> {
    pub fn new(
        query: &'a NormalizedQuery,
        gazetteer: &'a Gazetteer,
        year_match: YearMatch,
        max_rows: usize,
    ) -> Self {
        Self {
            query,
            gazetteer,
            year_match,
            max_rows,
        }
    }

    fn any_year_in_range(&self, text: &str) -> bool {
        year_tokens(text)
            .into_iter()
            .any(|y| self.query.year_in_range(y))
    }

    /// Whether a row carries a year inside the requested window.
    pub fn row_has_year(&self, row: &Record) -> bool {
        if self.query.year_range().is_none() {
            return true;
        }
        match self.year_match {
            YearMatch::AnyToken => self.any_year_in_range(&record_text(row)),
            YearMatch::NamedColumn => row
                .iter()
                .filter(|(column, _)| is_year_column(column))
                .any(|(_, value)| self.any_year_in_range(value)),
        }
    }

    fn dataset_has_year(&self, dataset: &CatalogDataset) -> bool {
        self.query.year_range().is_none()
            || self.any_year_in_range(&dataset.metadata_text())
            || dataset.tags.iter().any(|t| self.any_year_in_range(t))
    }

    fn dataset_mentions(&self, token: &str, dataset: &CatalogDataset, resource: &Resource) -> bool {
        contains_ci(&dataset.metadata_text(), token)
            || dataset.tags.iter().any(|t| contains_ci(t, token))
            || resource
                .host()
                .is_some_and(|host| self.gazetteer.is_authoritative_host(token, &host))
    }

    fn capped(&self, rows: Vec<Record>) -> Vec<Record> {
        rows.into_iter().take(self.max_rows).collect()
    }

    /// Filter a sample. All-or-nothing: either filtered rows or a rejection.
    pub fn evaluate(
        &self,
        sample: Sample,
        dataset: &CatalogDataset,
        resource: &Resource,
    ) -> Result<Sample, Rejection> {
        let total = sample.len();

        let Some(token) = self.query.geography.token() else {
            return if sample.rows.iter().any(|r| self.row_has_year(r)) {
                let provenance = format!("{}; no place given, year check only", sample.provenance);
                Ok(Sample::new(self.capped(sample.rows), sample.format, provenance))
            } else {
                Err(Rejection::YearOutOfRange)
            };
        };

        let matching: Vec<Record> = sample
            .rows
            .iter()
            .filter(|r| contains_ci(&record_text(r), token))
            .cloned()
            .collect();

        if !matching.is_empty() {
            if !matching.iter().any(|r| self.row_has_year(r)) {
                return Err(Rejection::YearOutOfRange);
            }
            let provenance = format!(
                "{}; {} of {} rows mention {}",
                sample.provenance,
                matching.len(),
                total,
                token
            );
            return Ok(Sample::new(self.capped(matching), sample.format, provenance));
        }

        if !self.dataset_mentions(token, dataset, resource) {
            return Err(Rejection::GeographyMismatch);
        }

        let year_ok =
            sample.rows.iter().any(|r| self.row_has_year(r)) || self.dataset_has_year(dataset);
        if !year_ok {
            return Err(Rejection::YearOutOfRange);
        }

        let provenance = format!("{}; dataset-level match on {}", sample.provenance, token);
        Ok(Sample::new(self.capped(sample.rows), sample.format, provenance))
    }
}

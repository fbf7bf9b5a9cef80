//! Configuration types for the discovery pipeline.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// How a year is recognized inside a sampled row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearMatch {
    /// Any 4-digit token in range, anywhere in the serialized row.
    ///
    /// Cheap but can false-positive on numeric fields such as postal codes.
    #[default]
    AnyToken,

    /// Only values of columns whose name looks like a year/period column.
    NamedColumn,
}

/// Configuration for the discovery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Row cap for each targeted variant search. Default: 50.
    pub search_rows: u32,

    /// Row cap for the broad geography scan. Default: 100.
    pub fallback_rows: u32,

    /// Datasets kept for sampling. Default: 12.
    pub max_candidates: usize,

    /// Rows kept per sample and in the result. Default: 20.
    pub max_sample_rows: usize,

    /// Non-blank lines read from delimited text (header included). Default: 101.
    pub max_delimited_lines: usize,

    /// Byte ceiling for a resource body. Default: 1,000,000.
    pub max_resource_bytes: u64,

    /// Resources fetched ahead concurrently. Order of acceptance is unaffected.
    ///
    /// Default: 4.
    pub sample_concurrency: usize,

    /// Year recognition mode for the relevance filter.
    #[serde(default)]
    pub year_match: YearMatch,

    /// Run the broad scan with the topic alone when no place is known.
    ///
    /// Default: false.
    #[serde(default)]
    pub broad_scan_without_geography: bool,

    /// Year used to expand "last N years".
    pub current_year: i32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_rows: 50,
            fallback_rows: 100,
            max_candidates: 12,
            max_sample_rows: 20,
            max_delimited_lines: 101,
            max_resource_bytes: 1_000_000,
            sample_concurrency: 4,
            year_match: YearMatch::AnyToken,
            broad_scan_without_geography: false,
            current_year: chrono::Utc::now().year(),
        }
    }
}

impl DiscoveryConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn with_year_match(mut self, mode: YearMatch) -> Self {
        self.year_match = mode;
        self
    }

    pub fn with_sample_concurrency(mut self, concurrency: usize) -> Self {
        self.sample_concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_resource_bytes(mut self, bytes: u64) -> Self {
        self.max_resource_bytes = bytes;
        self
    }

    pub fn with_broad_scan_without_geography(mut self, enabled: bool) -> Self {
        self.broad_scan_without_geography = enabled;
        self
    }

    /// Reject limits that would make every run trivially empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.search_rows == 0 || self.fallback_rows == 0 {
            return Err("search row caps must be positive".into());
        }
        if self.max_candidates == 0 || self.max_sample_rows == 0 {
            return Err("candidate and sample caps must be positive".into());
        }
        if self.max_delimited_lines < 2 {
            return Err("max_delimited_lines must allow a header and one row".into());
        }
        if self.max_resource_bytes == 0 {
            return Err("max_resource_bytes must be positive".into());
        }
        Ok(())
    }
}

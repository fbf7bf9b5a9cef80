//! Sampled rows and the outcome of one sampling attempt.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::dataset::ResourceFormat;

/// One row: column name to cell text, in source column order.
pub type Record = IndexMap<String, String>;

/// Serialized text of a row, used for token matching.
pub fn record_text(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_default()
}

/// A capped set of rows extracted from one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub rows: Vec<Record>,

    /// Why the sample has this shape and size.
    pub provenance: String,

    pub format: ResourceFormat,
}

impl Sample {
    pub fn new(rows: Vec<Record>, format: ResourceFormat, provenance: impl Into<String>) -> Self {
        Self {
            rows,
            provenance: provenance.into(),
            format,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// SHA-256 over the canonical row serialization.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for row in &self.rows {
            hasher.update(record_text(row).as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Why a resource or dataset was passed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Rejection {
    /// Declared format is neither JSON nor delimited text.
    UnsupportedFormat,
    /// Probe reported a body larger than the ceiling.
    TooLarge { bytes: u64 },
    /// Body parsed to zero rows (malformed, no array, too few lines).
    NoRows { detail: String },
    /// Rows matched the place but no row carried a year in range.
    YearOutOfRange,
    /// Neither rows nor dataset metadata mention the place.
    GeographyMismatch,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::UnsupportedFormat => f.write_str("unsupported format"),
            Rejection::TooLarge { bytes } => write!(f, "too large ({} bytes)", bytes),
            Rejection::NoRows { detail } => write!(f, "no rows: {}", detail),
            Rejection::YearOutOfRange => f.write_str("no year in range"),
            Rejection::GeographyMismatch => f.write_str("geography mismatch"),
        }
    }
}

/// Tagged outcome of one sampling attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Rows that passed relevance filtering.
    Accepted(Sample),
    Rejected(Rejection),
    /// Transport or security failure.
    Failed(crate::error::FetchError),
}

impl AttemptOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AttemptOutcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_record_text_preserves_column_order() {
        let r = row(&[("comune", "Milano"), ("anno", "2022")]);
        assert_eq!(record_text(&r), r#"{"comune":"Milano","anno":"2022"}"#);
    }

    #[test]
    fn test_digest_depends_on_rows_only() {
        let a = Sample::new(vec![row(&[("a", "1")])], ResourceFormat::Delimited, "first");
        let b = Sample::new(vec![row(&[("a", "1")])], ResourceFormat::Delimited, "second");
        let c = Sample::new(vec![row(&[("a", "2")])], ResourceFormat::Delimited, "first");

        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }
}

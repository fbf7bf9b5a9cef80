//! Remote entity extraction trait (the language-model seam).
//!
//! Implementations turn a raw question into [`RemoteEntities`]. The output is
//! untrusted: [`RemoteEntities::sanitized`] is applied before anything reads it.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExtractorResult;
use crate::types::query::is_valid_year;

/// Fields a remote extractor is asked to fill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RemoteEntities {
    /// Municipality named in the question, if any.
    pub city: Option<String>,

    /// Province, if named or implied.
    pub province: Option<String>,

    /// Region, if named or implied.
    pub region: Option<String>,

    /// Every year the question covers, with relative ranges expanded.
    #[serde(default)]
    pub years: Vec<i32>,

    /// Main statistical topic, one or two words, in Italian.
    pub topic: Option<String>,

    /// Italian synonyms of the topic likely to appear in dataset titles.
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Free-text notes on ambiguity.
    pub notes: Option<String>,
}

impl RemoteEntities {
    /// Trim strings, drop empties and implausible years.
    pub fn sanitized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
        }

        Self {
            city: clean(self.city),
            province: clean(self.province),
            region: clean(self.region),
            years: self.years.into_iter().filter(|y| is_valid_year(*y)).collect(),
            topic: clean(self.topic),
            synonyms: self
                .synonyms
                .into_iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            notes: clean(self.notes),
        }
    }
}

/// Remote structured extraction.
///
/// # Implementations
///
/// - `OpenAiExtractor` - OpenAI chat completions with a strict JSON schema
/// - `MockRemoteExtractor` - For testing
#[async_trait]
pub trait RemoteExtractor: Send + Sync {
    async fn extract(&self, question: &str) -> ExtractorResult<RemoteEntities>;
}

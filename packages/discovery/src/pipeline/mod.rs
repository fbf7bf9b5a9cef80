//! Pipeline stages, in execution order.
//!
//! ```text
//! question
//!   → entities   (remote extractor, heuristic fallback)
//!   → variants   (prioritized catalog requests)
//!   → search     (first non-empty variant wins)
//!   → fallback   (broad place-only scan, local topic scoring)
//!   → sampler    (ranked resources, bounded fetch, parse)
//!   → relevance  (row-level, then dataset-level, then year-only)
//!   → PipelineResult
//! ```
//!
//! [`run::Discovery`] wires the stages together.

pub mod entities;
pub mod fallback;
pub mod parse;
pub mod relevance;
pub mod run;
pub mod sampler;
pub mod search;
pub mod variants;

pub use entities::{extract_entities, extract_years, merge, HeuristicExtractor};
pub use fallback::{
    broad_request, broad_scan, rank_candidates, topic_score, FallbackOutcome, ScoredDataset,
};
pub use parse::{detect_delimiter, parse_delimited, parse_json, JsonShape};
pub use relevance::RelevanceFilter;
pub use run::{validate_question, Discovery, MAX_QUESTION_CHARS};
pub use sampler::{rank_resources, sample_resource, SampleOutcome};
pub use search::{execute_variants, SearchOutcome};
pub use variants::build_variants;

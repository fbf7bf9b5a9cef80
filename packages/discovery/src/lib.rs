//! Open-Data Discovery Library
//!
//! Turns a natural-language question about Italian public statistics into a
//! small, relevance-filtered sample of real rows from a public open-data
//! catalog, ready to hand to an answer-synthesis step.
//!
//! # Design Philosophy
//!
//! - Specific before broad: prioritized variants first, a scored scan last
//! - Bounded everything: byte ceilings, line caps, row caps
//! - Degrade, don't fail: only a malformed question is an error
//! - Deterministic: same catalog and payloads, same rows
//!
//! # Usage
//!
//! ```rust,ignore
//! use discovery::{CkanCatalog, Discovery, HttpFetcher, ValidatedFetcher};
//!
//! let discovery = Discovery::new(
//!     CkanCatalog::dati_gov_it().rate_limited(5),
//!     ValidatedFetcher::new(HttpFetcher::new()),
//! );
//!
//! let result = discovery.run("Confronta i reati a Milano negli ultimi 5 anni").await?;
//! if result.has_real_data {
//!     for row in &result.rows {
//!         println!("{:?}", row);
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams: Catalog, ResourceFetcher, RemoteExtractor
//! - [`types`] - Queries, variants, datasets, samples, results, config
//! - [`pipeline`] - The stages and the [`Discovery`] orchestrator
//! - [`ontology`] / [`gazetteer`] - Topic clusters and known places
//! - [`catalogs`] - CKAN catalog and rate limiting
//! - [`fetchers`] - HTTP resource fetcher
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod catalogs;
pub mod error;
pub mod fetchers;
pub mod gazetteer;
pub mod ontology;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    CatalogError, DiscoveryError, ExtractorError, FetchError, Result, SecurityError,
};
pub use gazetteer::{Gazetteer, Municipality};
pub use ontology::{Ontology, TopicEntry};
pub use traits::{
    catalog::{Catalog, SearchPage},
    extractor::{RemoteEntities, RemoteExtractor},
    fetcher::{ResourceFetcher, UrlValidator, ValidatedFetcher},
};
pub use types::{
    config::{DiscoveryConfig, YearMatch},
    dataset::{CatalogDataset, Resource, ResourceFormat},
    query::{Geography, NormalizedQuery, Topic},
    result::{AcceptedSource, DatasetSummary, DiscoveryRoute, PipelineResult},
    sample::{AttemptOutcome, Record, Rejection, Sample},
    variant::{QueryVariant, SearchRequest},
};

pub use pipeline::Discovery;

pub use catalogs::{CatalogExt, CkanCatalog, RateLimitedCatalog};
pub use fetchers::HttpFetcher;
pub use security::SecretString;

#[cfg(feature = "openai")]
pub use ai::OpenAiExtractor;

// Re-export testing utilities
pub use testing::{MockCatalog, MockFetcher, MockRemoteExtractor};

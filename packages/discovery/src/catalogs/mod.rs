//! Catalog implementations.

pub mod ckan;
pub mod rate_limited;

pub use ckan::CkanCatalog;
pub use rate_limited::{CatalogExt, RateLimitedCatalog};

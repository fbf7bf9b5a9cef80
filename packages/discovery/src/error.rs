//! Typed errors for the discovery library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Only
//! [`DiscoveryError::InvalidQuestion`] ever escapes a pipeline run; every
//! other error is absorbed as "this candidate failed, try the next".

use thiserror::Error;

/// Errors surfaced by the pipeline entry points.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The question could not be accepted as input
    #[error("invalid question: {reason}")]
    InvalidQuestion { reason: String },

    /// Configuration error (unreadable ontology, bad limits)
    #[error("config error: {0}")]
    Config(String),
}

/// Errors from the catalog search service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Transport-level failure
    #[error("catalog HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success HTTP status
    #[error("catalog returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The catalog answered but flagged the request as failed
    #[error("catalog request unsuccessful: {0}")]
    Unsuccessful(String),
}

impl From<ckan_client::CkanError> for CatalogError {
    fn from(err: ckan_client::CkanError) -> Self {
        match err {
            ckan_client::CkanError::Http(e) => CatalogError::Http(Box::new(e)),
            ckan_client::CkanError::Api { status, message } => {
                CatalogError::Status { status, message }
            }
            ckan_client::CkanError::Unsuccessful(m) => CatalogError::Unsuccessful(m),
        }
    }
}

/// Errors while probing or fetching a resource body.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Non-success HTTP status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Request timed out
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, metadata services)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors from the remote entity extractor.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Missing API key or invalid settings
    #[error("extractor config error: {0}")]
    Config(String),

    /// Connection failed or timed out
    #[error("extractor network error: {0}")]
    Network(String),

    /// Non-2xx response, rate limit, empty choice list
    #[error("extractor API error: {0}")]
    Api(String),

    /// Response was not the JSON shape we asked for
    #[error("extractor parse error: {0}")]
    Parse(String),
}

/// Result type alias for pipeline entry points.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Result type alias for resource fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

/// Result type alias for remote extraction.
pub type ExtractorResult<T> = std::result::Result<T, ExtractorError>;

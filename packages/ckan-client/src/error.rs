//! Error types for the CKAN client.

use thiserror::Error;

/// Result type for CKAN client operations.
pub type Result<T> = std::result::Result<T, CkanError>;

/// CKAN client errors.
#[derive(Debug, Error)]
pub enum CkanError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the action API
    #[error("CKAN API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 2xx response whose envelope reports `success: false`
    #[error("CKAN action unsuccessful: {0}")]
    Unsuccessful(String),
}

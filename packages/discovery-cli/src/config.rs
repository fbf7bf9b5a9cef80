use anyhow::{Context, Result};
use discovery::SecretString;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub catalog_url: String,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub http_timeout: Duration,
    pub catalog_requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            catalog_url: env::var("CATALOG_URL")
                .unwrap_or_else(|_| ckan_client::DATI_GOV_IT.to_string()),
            openai_api_key: env::var("OPENAI_API_KEY")
                .ok()
                .map(SecretString::from)
                .filter(|key| !key.is_empty()),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| discovery::ai::openai::DEFAULT_MODEL.to_string()),
            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .context("HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            catalog_requests_per_second: env::var("CATALOG_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("CATALOG_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }
}

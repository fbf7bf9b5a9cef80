//! HTTP resource fetcher.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::ResourceFetcher;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Fetches resource bodies over HTTP(S).
///
/// Probes with `HEAD` and reads `Content-Length`; fetches with `GET` and stops
/// reading once the byte ceiling is reached, so oversized bodies are never
/// buffered whole.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = ValidatedFetcher::new(HttpFetcher::new().with_timeout(Duration::from_secs(10)));
/// ```
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Fetcher whose client gives up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            user_agent: "DatiAsk/1.0".to_string(),
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn map_error(url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http(Box::new(e))
        }
    }

    fn check_status(url: &str, response: &reqwest::Response) -> FetchResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn probe(&self, url: &str) -> FetchResult<Option<u64>> {
        let response = self
            .client
            .head(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;
        Self::check_status(url, &response)?;

        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        debug!(?length, "Probe answered");
        Ok(length)
    }

    #[instrument(skip(self))]
    async fn fetch(&self, url: &str, max_bytes: u64) -> FetchResult<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Self::map_error(url, e))?;
        Self::check_status(url, &response)?;

        let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Self::map_error(url, e))?
        {
            let room = limit.saturating_sub(body.len());
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(bytes = body.len(), "Body reached the byte ceiling");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        debug!(bytes = body.len(), "Body fetched");
        Ok(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

//! Resource fetcher trait and URL validation for SSRF protection.
//!
//! Resource URLs come straight out of catalog records, so every probe and
//! fetch goes through a [`ValidatedFetcher`] in production.

use async_trait::async_trait;
use std::collections::HashSet;
use std::net::IpAddr;

use crate::error::{FetchError, FetchResult, SecurityError, SecurityResult};

/// Fetches resource bodies with a metadata probe and a byte ceiling.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Metadata-only request. Returns the declared content length, if any.
    async fn probe(&self, url: &str) -> FetchResult<Option<u64>>;

    /// Fetch at most `max_bytes` of the body; longer bodies are truncated.
    async fn fetch(&self, url: &str, max_bytes: u64) -> FetchResult<Vec<u8>>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// URL validator for SSRF protection.
///
/// Rejects:
/// - Internal services (localhost, 127.0.0.1)
/// - Private IP ranges (10.x, 172.16.x, 192.168.x)
/// - Cloud metadata services (169.254.x)
/// - Non-HTTP(S) schemes (file://, ftp://)
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<ipnet::IpNet>,

    /// Hosts that bypass every other check
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    /// Create a validator with default security rules.
    pub fn new() -> Self {
        let blocked_cidrs = [
            "10.0.0.0/8",
            "172.16.0.0/12",
            "192.168.0.0/16",
            "169.254.0.0/16", // Link-local / cloud metadata
            "127.0.0.0/8",
            "0.0.0.0/8",
            "::1/128",
            "fc00::/7",
            "fe80::/10",
        ]
        .into_iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect();

        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "127.0.0.1",
                "::1",
                "[::1]",
                "0.0.0.0",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_cidrs,
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Static checks: scheme, host list, literal IPs.
    pub fn validate(&self, url: &str) -> SecurityResult<()> {
        let parsed = url::Url::parse(url)?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;

        if self.allowed_hosts.contains(host) {
            return Ok(());
        }

        if self.blocked_hosts.contains(host) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        let literal = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = literal.parse::<IpAddr>() {
            self.check_ip(ip)?;
        }

        Ok(())
    }

    /// Static checks plus DNS resolution, catching names that resolve inward.
    pub async fn validate_with_dns(&self, url: &str) -> SecurityResult<()> {
        self.validate(url)?;

        let parsed = url::Url::parse(url)?;
        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;

        if self.allowed_hosts.contains(host) {
            return Ok(());
        }

        let literal = host.trim_start_matches('[').trim_end_matches(']');
        if literal.parse::<IpAddr>().is_ok() {
            return Ok(());
        }

        let port = parsed.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host(format!("{}:{}", host, port))
            .await
            .map_err(|e| SecurityError::DnsResolution(e.to_string()))?;

        for addr in addrs {
            self.check_ip(addr.ip())?;
        }

        Ok(())
    }

    fn check_ip(&self, ip: IpAddr) -> SecurityResult<()> {
        if self.blocked_cidrs.iter().any(|cidr| cidr.contains(&ip)) {
            return Err(SecurityError::BlockedCidr(ip.to_string()));
        }
        Ok(())
    }
}

/// A fetcher that validates URLs before probing or fetching.
///
/// # Example
///
/// ```rust,ignore
/// let fetcher = ValidatedFetcher::new(HttpFetcher::new());
/// let body = fetcher.fetch("https://dati.comune.milano.it/x.csv", 1_000_000).await?;
/// ```
pub struct ValidatedFetcher<F: ResourceFetcher> {
    inner: F,
    validator: UrlValidator,
}

impl<F: ResourceFetcher> ValidatedFetcher<F> {
    /// Create a validated fetcher with default security rules.
    pub fn new(fetcher: F) -> Self {
        Self {
            inner: fetcher,
            validator: UrlValidator::new(),
        }
    }

    /// Create with a custom validator.
    pub fn with_validator(fetcher: F, validator: UrlValidator) -> Self {
        Self {
            inner: fetcher,
            validator,
        }
    }

    async fn validate_url(&self, url: &str) -> FetchResult<()> {
        self.validator
            .validate_with_dns(url)
            .await
            .map_err(FetchError::Security)
    }
}

#[async_trait]
impl<F: ResourceFetcher> ResourceFetcher for ValidatedFetcher<F> {
    async fn probe(&self, url: &str) -> FetchResult<Option<u64>> {
        self.validate_url(url).await?;
        self.inner.probe(url).await
    }

    async fn fetch(&self, url: &str, max_bytes: u64) -> FetchResult<Vec<u8>> {
        self.validate_url(url).await?;
        self.inner.fetch(url, max_bytes).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    #[test]
    fn test_blocks_internal_targets() {
        let validator = UrlValidator::new();

        assert!(validator.validate("https://dati.comune.milano.it/a.csv").is_ok());
        assert!(matches!(
            validator.validate("file:///etc/passwd"),
            Err(SecurityError::DisallowedScheme(_))
        ));
        assert!(matches!(
            validator.validate("http://localhost:8080/x"),
            Err(SecurityError::BlockedHost(_))
        ));
        assert!(matches!(
            validator.validate("http://169.254.169.254/latest/meta-data"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(matches!(
            validator.validate("http://10.1.2.3/data.json"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(matches!(
            validator.validate("http://[fe80::1]/data.json"),
            Err(SecurityError::BlockedCidr(_))
        ));
    }

    #[test]
    fn test_allow_host_bypasses_checks() {
        let validator = UrlValidator::new().allow_host("localhost");
        assert!(validator.validate("http://localhost/x.csv").is_ok());
    }

    #[tokio::test]
    async fn test_validated_fetcher_never_reaches_inner_for_blocked_url() {
        let inner = MockFetcher::new().with_body("http://127.0.0.1/x.csv", "a,b\n1,2");
        let fetcher = ValidatedFetcher::new(inner.clone());

        let err = fetcher.fetch("http://127.0.0.1/x.csv", 1000).await.unwrap_err();
        assert!(matches!(err, FetchError::Security(_)));
        assert_eq!(inner.fetch_count(), 0);
        assert_eq!(inner.probe_count(), 0);
    }
}

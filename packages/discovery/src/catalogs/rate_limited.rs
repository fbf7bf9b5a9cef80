//! Rate-limited catalog wrapper.
//!
//! Wraps any Catalog implementation with a request quota using the governor
//! crate. Public portals throttle aggressively, so production catalogs go
//! through this.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::CatalogResult;
use crate::traits::catalog::{Catalog, SearchPage};
use crate::types::variant::SearchRequest;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A catalog wrapper that enforces a requests-per-second quota.
pub struct RateLimitedCatalog<C: Catalog> {
    inner: C,
    limiter: Arc<DefaultRateLimiter>,
}

impl<C: Catalog> RateLimitedCatalog<C> {
    /// Wrap `catalog`. A zero rate is treated as one request per second.
    pub fn new(catalog: C, requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(catalog, Quota::per_second(rate))
    }

    /// Create with a custom quota.
    pub fn with_quota(catalog: C, quota: Quota) -> Self {
        Self {
            inner: catalog,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<C: Catalog> Catalog for RateLimitedCatalog<C> {
    async fn search(&self, request: &SearchRequest, rows: u32) -> CatalogResult<SearchPage> {
        self.limiter.until_ready().await;
        self.inner.search(request, rows).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Extension trait for easy rate limiting.
pub trait CatalogExt: Catalog + Sized {
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedCatalog<Self> {
        RateLimitedCatalog::new(self, requests_per_second)
    }
}

impl<C: Catalog + Sized> CatalogExt for C {}

//! Testing utilities including mock implementations.
//!
//! These let applications exercise the discovery pipeline without a live
//! catalog, real resource hosts or a language model.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{
    CatalogError, CatalogResult, ExtractorError, ExtractorResult, FetchError, FetchResult,
};
use crate::traits::{
    catalog::{Catalog, SearchPage},
    extractor::{RemoteEntities, RemoteExtractor},
    fetcher::ResourceFetcher,
};
use crate::types::variant::SearchRequest;

type RequestKey = (String, Option<String>);

fn key_of(request: &SearchRequest) -> RequestKey {
    let (text, filter) = request.dedup_key();
    (text.to_string(), filter.map(String::from))
}

type PageRule = Arc<dyn Fn(&SearchRequest) -> bool + Send + Sync>;

/// A mock catalog with canned pages.
///
/// Lookup order: exact (text, filter) match, then predicate rules in the
/// order they were added, then the default page (empty unless set). Sort is
/// ignored. Clones share state, so a clone handed to the pipeline can be
/// inspected afterwards.
#[derive(Clone, Default)]
pub struct MockCatalog {
    pages: Arc<RwLock<HashMap<RequestKey, SearchPage>>>,
    rules: Arc<RwLock<Vec<(PageRule, SearchPage)>>>,
    failures: Arc<RwLock<HashSet<RequestKey>>>,
    default_page: Arc<RwLock<SearchPage>>,
    calls: Arc<RwLock<Vec<(SearchRequest, u32)>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page returned for requests with this text and filter.
    pub fn with_page(self, request: SearchRequest, page: SearchPage) -> Self {
        self.pages.write().unwrap().insert(key_of(&request), page);
        self
    }

    /// Page returned for any request matching `predicate`.
    pub fn with_page_when(
        self,
        predicate: impl Fn(&SearchRequest) -> bool + Send + Sync + 'static,
        page: SearchPage,
    ) -> Self {
        self.rules.write().unwrap().push((Arc::new(predicate), page));
        self
    }

    /// Page returned when nothing else matches.
    pub fn with_default(self, page: SearchPage) -> Self {
        *self.default_page.write().unwrap() = page;
        self
    }

    /// Make requests with this text and filter fail.
    pub fn with_failure(self, request: SearchRequest) -> Self {
        self.failures.write().unwrap().insert(key_of(&request));
        self
    }

    /// Every request received, with its row cap.
    pub fn calls(&self) -> Vec<(SearchRequest, u32)> {
        self.calls.read().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn search(&self, request: &SearchRequest, rows: u32) -> CatalogResult<SearchPage> {
        self.calls.write().unwrap().push((request.clone(), rows));

        let key = key_of(request);
        if self.failures.read().unwrap().contains(&key) {
            return Err(CatalogError::Status {
                status: 500,
                message: "mock failure".to_string(),
            });
        }

        if let Some(page) = self.pages.read().unwrap().get(&key) {
            return Ok(page.clone());
        }

        if let Some((_, page)) = self
            .rules
            .read()
            .unwrap()
            .iter()
            .find(|(rule, _)| rule(request))
        {
            return Ok(page.clone());
        }

        Ok(self.default_page.read().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock fetcher serving bodies from memory.
///
/// Probes report the body length unless overridden. Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    bodies: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    lengths: Arc<RwLock<HashMap<String, Option<u64>>>>,
    failures: Arc<RwLock<HashSet<String>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    probe_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.write().unwrap().insert(url.into(), body.into());
        self
    }

    /// Declared length reported by the probe, regardless of the real body.
    pub fn with_length(self, url: impl Into<String>, bytes: u64) -> Self {
        self.lengths.write().unwrap().insert(url.into(), Some(bytes));
        self
    }

    /// Probe reports no length.
    pub fn without_length(self, url: impl Into<String>) -> Self {
        self.lengths.write().unwrap().insert(url.into(), None);
        self
    }

    /// Probe and fetch time out.
    pub fn with_failure(self, url: impl Into<String>) -> Self {
        self.failures.write().unwrap().insert(url.into());
        self
    }

    /// Fetch waits this long before answering.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.write().unwrap().insert(url.into(), delay);
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn check(&self, url: &str) -> FetchResult<()> {
        if self.failures.read().unwrap().contains(url) {
            return Err(FetchError::Timeout {
                url: url.to_string(),
            });
        }
        if !self.bodies.read().unwrap().contains_key(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn probe(&self, url: &str) -> FetchResult<Option<u64>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.check(url)?;

        if let Some(declared) = self.lengths.read().unwrap().get(url) {
            return Ok(*declared);
        }
        Ok(self
            .bodies
            .read()
            .unwrap()
            .get(url)
            .map(|body| body.len() as u64))
    }

    async fn fetch(&self, url: &str, max_bytes: u64) -> FetchResult<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.read().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check(url)?;

        let mut body = self
            .bodies
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();
        body.truncate(usize::try_from(max_bytes).unwrap_or(usize::MAX));
        Ok(body)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock remote extractor with a fixed answer.
#[derive(Clone)]
pub struct MockRemoteExtractor {
    response: Result<RemoteEntities, String>,
    calls: Arc<AtomicUsize>,
}

impl MockRemoteExtractor {
    pub fn returning(entities: RemoteEntities) -> Self {
        Self {
            response: Ok(entities),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteExtractor for MockRemoteExtractor {
    async fn extract(&self, _question: &str) -> ExtractorResult<RemoteEntities> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map_err(ExtractorError::Api)
    }
}

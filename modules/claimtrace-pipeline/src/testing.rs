// Test mocks for the evidence pipeline.
//
// One mock per capability trait:
// - MockModel (LanguageModel): scripted queue of JSON responses
// - MockFactCheckIndex (FactCheckIndex): scripted per-call results
// - MockWebSearchIndex (WebSearchIndex): query-to-results map
// - MockPageFetcher (PageFetcher): url-to-page map
//
// All are deterministic and in-memory: no network, no API keys.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use ai_client::{LanguageModel, ModelError};
use claimtrace_common::{normalize_url, EvidenceItem, EvidenceSource, FetchedPage, PageKind};

use crate::traits::{FactCheckIndex, PageFetcher, SearchError, WebSearchIndex};

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn evidence(title: &str, url: &str, snippet: &str, source: EvidenceSource) -> EvidenceItem {
    EvidenceItem::new(title, url, snippet, source)
}

pub fn page(url: &str, text: &str) -> FetchedPage {
    FetchedPage {
        url: normalize_url(url),
        title: "Test Page".to_string(),
        description: "A test page".to_string(),
        text: text.to_string(),
        html: String::new(),
        content_type: PageKind::Html,
    }
}

// ---------------------------------------------------------------------------
// MockModel
// ---------------------------------------------------------------------------

/// Scripted language model. `generate_json` pops responses in order;
/// an empty queue (or `failing()`) yields `ModelError::EmptyResponse`.
pub struct MockModel {
    responses: Mutex<VecDeque<serde_json::Value>>,
    calls: AtomicUsize,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A model whose every call fails.
    pub fn failing() -> Self {
        Self::new()
    }

    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.responses.lock().unwrap().push_back(value);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<String, ModelError> {
        self.generate_json(_system, _user, _temperature)
            .await
            .map(|v| v.to_string())
    }

    async fn generate_json(
        &self,
        _system: &str,
        _user: &str,
        _temperature: f32,
    ) -> Result<serde_json::Value, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ModelError::EmptyResponse)
    }
}

// ---------------------------------------------------------------------------
// MockFactCheckIndex
// ---------------------------------------------------------------------------

/// Scripted fact-check index. Responses are consumed call by call; an
/// exhausted script returns empty results, mirroring a source with nothing
/// to say.
pub struct MockFactCheckIndex {
    script: Mutex<VecDeque<Result<Vec<EvidenceItem>, SearchError>>>,
    calls: AtomicUsize,
}

impl MockFactCheckIndex {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_script(self, responses: Vec<Result<Vec<EvidenceItem>, SearchError>>) -> Self {
        *self.script.lock().unwrap() = responses.into();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockFactCheckIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactCheckIndex for MockFactCheckIndex {
    async fn search(
        &self,
        _query: &str,
        _page_size: u32,
        _max_age_days: Option<u32>,
    ) -> Result<Vec<EvidenceItem>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// MockWebSearchIndex
// ---------------------------------------------------------------------------

/// Map-based web search: exact query → results, everything else empty.
pub struct MockWebSearchIndex {
    results: HashMap<String, Vec<EvidenceItem>>,
    fail: bool,
}

impl MockWebSearchIndex {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            fail: false,
        }
    }

    pub fn with_results(mut self, query: &str, items: Vec<EvidenceItem>) -> Self {
        self.results.insert(query.to_string(), items);
        self
    }

    pub fn always_fail(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Default for MockWebSearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearchIndex for MockWebSearchIndex {
    async fn search(&self, query: &str, _count: u32) -> Result<Vec<EvidenceItem>, SearchError> {
        if self.fail {
            return Err(SearchError::Transport("mock web search failure".to_string()));
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// Map-based page fetcher. Unregistered URLs yield `None`, the same as an
/// unreachable page.
pub struct MockPageFetcher {
    pages: HashMap<String, FetchedPage>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn on_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(normalize_url(url), page);
        self
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        self.pages.get(&normalize_url(url)).cloned()
    }

    async fn fetch_all(&self, urls: &[String], cancel: &CancellationToken) -> Vec<FetchedPage> {
        let mut pages = Vec::new();
        for url in urls {
            if cancel.is_cancelled() {
                break;
            }
            if let Some(page) = self.fetch(url).await {
                pages.push(page);
            }
        }
        pages
    }
}

// Trait abstractions for the evidence pipeline's external collaborators.
//
// Every network-touching capability sits behind one of these traits so the
// orchestrator can be exercised with in-memory mocks: no network, no API
// keys. `cargo test` in seconds.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use claimtrace_common::{EvidenceItem, FetchedPage};

/// Errors from the evidence-source capabilities. The retriever maps these to
/// ladder advancement or empty results; they never cross the pipeline
/// boundary.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport error: {0}")]
    Transport(String),

    #[error("search service unavailable (503)")]
    Unavailable,

    #[error("search API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("search response malformed: {0}")]
    Malformed(String),
}

// ---------------------------------------------------------------------------
// Evidence sources
// ---------------------------------------------------------------------------

/// Curated fact-check index (claim-review style search).
///
/// Contract: HTTP 403 from the backing service means "no facts found" and
/// MUST surface as `Ok(vec![])`, not an error.
#[async_trait]
pub trait FactCheckIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        page_size: u32,
        max_age_days: Option<u32>,
    ) -> Result<Vec<EvidenceItem>, SearchError>;
}

/// General web-search index.
#[async_trait]
pub trait WebSearchIndex: Send + Sync {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<EvidenceItem>, SearchError>;
}

// ---------------------------------------------------------------------------
// Content fetching
// ---------------------------------------------------------------------------

/// Single-hop page fetcher. Total: an unreachable, invalid, or empty page is
/// `None`, never an error; failures are logged at the implementation.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<FetchedPage>;

    /// Fetch many URLs with bounded concurrency. Results keep input order;
    /// failed fetches are dropped. Cancellation stops scheduling new fetches
    /// without aborting those already in flight.
    async fn fetch_all(&self, urls: &[String], cancel: &CancellationToken) -> Vec<FetchedPage>;
}

// ---------------------------------------------------------------------------
// Language utilities
// ---------------------------------------------------------------------------

/// ISO-639-1 language detection. Total: any failure or input under 3 chars
/// yields "en".
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> String;
}

/// Translation to English. Total: returns the input unchanged when the
/// capability is unconfigured or the call fails.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_to_english(&self, text: &str) -> String;
}

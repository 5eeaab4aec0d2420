// Single-hop page fetching with readable-text extraction.
//
// HTML goes through a priority cascade: <article> → <main> → largest run of
// adjacent <p> elements → whole <body>, each with structural tags stripped.
// PDFs go through pdf-extract. All parsing happens in sync helpers so the
// fetch futures stay Send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use claimtrace_common::text::truncate_chars;
use claimtrace_common::{is_valid_url, normalize_url, FetchedPage, PageKind, MAX_STORED_HTML};

use crate::traits::PageFetcher;

/// Max simultaneous in-flight requests per `fetch_all` call.
const MAX_CONCURRENT_FETCHES: usize = 10;
/// Cascade tiers must produce more than this many chars to be accepted.
const MIN_CASCADE_TEXT: usize = 100;
/// Paragraphs shorter than this are skipped without breaking a run.
const MIN_PARAGRAPH_LEN: usize = 10;
/// Below this, extracted text is replaced by the title/description fallback.
const MIN_ACCEPTABLE_TEXT: usize = 50;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Tags stripped before any text extraction.
const STRUCTURAL_TAGS: &[&str] = &["script", "style", "nav", "aside", "header", "footer"];

pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            max_retries: max_retries.max(1),
        }
    }

    async fn fetch_once(&self, url: &str) -> anyhow::Result<Option<FetchedPage>> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status}");
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if content_type.contains("application/pdf") || url.to_lowercase().ends_with(".pdf") {
            let bytes = response.bytes().await?;
            return Ok(parse_pdf_page(url, &bytes));
        }

        let html = response.text().await?;
        Ok(Some(parse_html_page(url, &html)))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        if !is_valid_url(url) {
            debug!(url, "Skipping invalid URL");
            return None;
        }

        for attempt in 0..self.max_retries {
            match self.fetch_once(url).await {
                Ok(page) => {
                    if let Some(ref p) = page {
                        info!(url, bytes = p.text.len(), "Page fetched");
                    }
                    return page;
                }
                Err(e) => {
                    if attempt + 1 == self.max_retries {
                        warn!(url, error = %e, "Fetch failed after final attempt");
                    }
                }
            }
        }

        None
    }

    async fn fetch_all(&self, urls: &[String], cancel: &CancellationToken) -> Vec<FetchedPage> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));

        let futures = urls.iter().map(|url| {
            let semaphore = semaphore.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let _permit = semaphore.acquire().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }
                self.fetch(url).await
            }
        });

        futures::future::join_all(futures)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PDF extraction
// ---------------------------------------------------------------------------

/// Extract text from a fetched PDF. Returns `None` when no text could be
/// extracted; the caller treats that as "no content".
pub fn parse_pdf_page(url: &str, bytes: &[u8]) -> Option<FetchedPage> {
    let text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => collapse_whitespace(&text),
        Err(e) => {
            warn!(url, error = %e, "PDF text extraction failed");
            return None;
        }
    };

    if text.is_empty() {
        return None;
    }

    let title = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("PDF Document")
        .to_string();

    let description = if text.chars().count() > 200 {
        format!("{}...", truncate_chars(&text, 200))
    } else {
        text.clone()
    };

    Some(FetchedPage {
        url: normalize_url(url),
        title,
        description,
        text,
        html: String::new(),
        content_type: PageKind::Pdf,
    })
}

// ---------------------------------------------------------------------------
// HTML extraction
// ---------------------------------------------------------------------------

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Parse an HTML document into a `FetchedPage`: title and description
/// cascades plus the body-text priority cascade.
pub fn parse_html_page(url: &str, html: &str) -> FetchedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let description = extract_description(&document);

    let mut text = collapse_whitespace(&extract_body_text(&document));

    // Last resort: a title/description stub beats returning nothing.
    if text.len() < MIN_ACCEPTABLE_TEXT {
        let fallback = format!("{title}. {description}").trim().to_string();
        if fallback.len() > 10 {
            warn!(url, "Limited text extracted, using title/description fallback");
            text = fallback;
        }
    }

    FetchedPage {
        url: normalize_url(url),
        title,
        description,
        text,
        html: truncate_chars(html, MAX_STORED_HTML),
        content_type: PageKind::Html,
    }
}

fn extract_title(document: &Html) -> String {
    if let Some(el) = document.select(&selector("title")).next() {
        let title = el.text().collect::<String>().trim().to_string();
        if !title.is_empty() {
            return title;
        }
    }

    if let Some(el) = document.select(&selector(r#"meta[property="og:title"]"#)).next() {
        if let Some(content) = el.value().attr("content") {
            if !content.trim().is_empty() {
                return content.trim().to_string();
            }
        }
    }

    if let Some(el) = document.select(&selector("h1")).next() {
        return el.text().collect::<String>().trim().to_string();
    }

    String::new()
}

fn extract_description(document: &Html) -> String {
    if let Some(el) = document.select(&selector(r#"meta[name="description"]"#)).next() {
        if let Some(content) = el.value().attr("content") {
            if !content.trim().is_empty() {
                return content.trim().to_string();
            }
        }
    }

    if let Some(el) = document
        .select(&selector(r#"meta[property="og:description"]"#))
        .next()
    {
        if let Some(content) = el.value().attr("content") {
            if !content.trim().is_empty() {
                return content.trim().to_string();
            }
        }
    }

    if let Some(el) = document.select(&selector("p")).next() {
        let text = collapse_whitespace(&el.text().collect::<String>());
        return truncate_chars(&text, 200);
    }

    String::new()
}

/// The body-text priority cascade.
fn extract_body_text(document: &Html) -> String {
    // Priority 1: <article>
    if let Some(article) = document.select(&selector("article")).next() {
        let text = text_excluding_structural(article);
        if text.len() > MIN_CASCADE_TEXT {
            return text;
        }
    }

    // Priority 2: <main>
    if let Some(main) = document.select(&selector("main")).next() {
        let text = text_excluding_structural(main);
        if text.len() > MIN_CASCADE_TEXT {
            return text;
        }
    }

    // Priority 3: largest run of adjacent <p> elements
    let run = largest_paragraph_run(document);
    if run.len() > MIN_CASCADE_TEXT {
        return run;
    }

    // Fallback: whole body, structural tags stripped
    if let Some(body) = document.select(&selector("body")).next() {
        return text_excluding_structural(body);
    }

    String::new()
}

/// Collect descendant text, skipping anything inside a structural tag.
fn text_excluding_structural(root: ElementRef) -> String {
    let mut parts: Vec<String> = Vec::new();

    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            let excluded = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| STRUCTURAL_TAGS.contains(&e.name()))
            });
            if !excluded {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
        }
    }

    parts.join(" ")
}

/// Find the largest contiguous run of sibling <p> elements. Paragraphs under
/// `MIN_PARAGRAPH_LEN` chars are skipped without breaking the run; a change
/// of parent ends it.
fn largest_paragraph_run(document: &Html) -> String {
    let p_selector = selector("p");

    // Short paragraphs are filtered out up front, so they neither count
    // toward a run nor break one.
    let paragraphs: Vec<_> = document
        .select(&p_selector)
        .filter_map(|p| {
            let text = collapse_whitespace(&p.text().collect::<String>());
            if text.len() < MIN_PARAGRAPH_LEN {
                return None;
            }
            Some((p.parent().map(|n| n.id()), text))
        })
        .collect();

    let mut best_len = 0usize;
    let mut best = String::new();

    let mut idx = 0;
    while idx < paragraphs.len() {
        let parent = paragraphs[idx].0;
        let mut end = idx;
        while end < paragraphs.len() && paragraphs[end].0 == parent {
            end += 1;
        }

        let run_len: usize = paragraphs[idx..end].iter().map(|(_, t)| t.len()).sum();
        if run_len > best_len {
            best_len = run_len;
            best = paragraphs[idx..end]
                .iter()
                .map(|(_, t)| t.as_str())
                .collect::<Vec<_>>()
                .join(" ");
        }
        idx = end;
    }

    best
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

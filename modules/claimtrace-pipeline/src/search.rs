// Evidence-source adapters: Google Fact Check Tools and Google Custom
// Search, plus the regional fact-check whitelist promotion both apply to
// their own results before the retriever merges them.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use claimtrace_common::text::truncate_chars;
use claimtrace_common::{EvidenceItem, EvidenceSource};

use crate::traits::{FactCheckIndex, SearchError, WebSearchIndex};

/// Per-request budget for both search services.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Known-trustworthy regional fact-check domains, moved to the front of
/// result lists so they are never buried by generic matches.
pub const REGIONAL_FACTCHECK_WHITELIST: &[&str] = &[
    "altnews.in",
    "boomlive.in",
    "factly.in",
    "pib.gov.in",
    "indiatoday.in/fact-check",
    "thequint.com/fact-check",
    "factcrescendo.com",
];

/// At most this many whitelisted items occupy the top slots of a merged list.
pub const WHITELIST_TOP_SLOTS: usize = 3;

pub fn is_whitelisted(url: &str) -> bool {
    let url_lower = url.to_lowercase();
    REGIONAL_FACTCHECK_WHITELIST
        .iter()
        .any(|domain| url_lower.contains(domain))
}

/// Move whitelisted items to the front, preserving relative order within
/// each partition. `cap` bounds how many whitelisted items lead the list;
/// the overflow joins the others in original order.
pub fn promote_whitelisted(items: Vec<EvidenceItem>, cap: usize) -> Vec<EvidenceItem> {
    let (whitelisted, others): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|item| is_whitelisted(&item.url));

    let mut promoted = Vec::with_capacity(whitelisted.len() + others.len());
    let mut overflow = Vec::new();
    for (idx, item) in whitelisted.into_iter().enumerate() {
        if idx < cap {
            promoted.push(item);
        } else {
            overflow.push(item);
        }
    }
    promoted.extend(overflow);
    promoted.extend(others);
    promoted
}

// ---------------------------------------------------------------------------
// Google Fact Check Tools
// ---------------------------------------------------------------------------

const FACTCHECK_URL: &str = "https://factchecktools.googleapis.com/v1alpha1/claims:search";

pub struct GoogleFactCheckIndex {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FactCheckResponse {
    #[serde(default)]
    claims: Vec<FactCheckClaim>,
}

#[derive(Debug, Deserialize)]
struct FactCheckClaim {
    #[serde(default)]
    text: String,
    #[serde(default)]
    claimant: String,
    #[serde(default, rename = "claimReview")]
    claim_review: Vec<ClaimReview>,
}

#[derive(Debug, Deserialize)]
struct ClaimReview {
    #[serde(default)]
    url: String,
    #[serde(default, rename = "textualRating")]
    textual_rating: String,
    publisher: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    #[serde(default)]
    name: String,
}

impl GoogleFactCheckIndex {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(SEARCH_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: FACTCHECK_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    fn parse_claims(&self, response: FactCheckResponse, max_results: usize) -> Vec<EvidenceItem> {
        let mut results = Vec::new();
        for claim in response.claims.into_iter().take(max_results) {
            let review_urls: Vec<&str> = claim
                .claim_review
                .iter()
                .map(|r| r.url.as_str())
                .filter(|u| !u.is_empty())
                .collect();

            let review_texts: Vec<String> = claim
                .claim_review
                .iter()
                .filter_map(|r| {
                    if !r.textual_rating.is_empty() {
                        Some(r.textual_rating.clone())
                    } else {
                        r.publisher.as_ref().map(|p| p.name.clone())
                    }
                })
                .filter(|t| !t.is_empty())
                .collect();

            let url = review_urls
                .first()
                .map(|u| u.to_string())
                .unwrap_or_else(|| claim.claimant.clone());

            let title = if claim.text.is_empty() {
                "Fact Check".to_string()
            } else {
                truncate_chars(&claim.text, 100)
            };

            let snippet = if review_texts.is_empty() {
                truncate_chars(&claim.text, 300)
            } else {
                truncate_chars(&review_texts[..review_texts.len().min(2)].join(" "), 300)
            };

            results.push(EvidenceItem::new(
                title,
                url,
                snippet,
                EvidenceSource::FactCheckApi,
            ));
        }
        results
    }
}

#[async_trait]
impl FactCheckIndex for GoogleFactCheckIndex {
    async fn search(
        &self,
        query: &str,
        page_size: u32,
        max_age_days: Option<u32>,
    ) -> Result<Vec<EvidenceItem>, SearchError> {
        if self.api_key.is_empty() {
            return Ok(Vec::new());
        }

        let mut params: Vec<(&str, String)> = vec![
            ("key", self.api_key.clone()),
            ("query", query.to_string()),
            ("languageCode", "en-US".to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(days) = max_age_days {
            params.push(("maxAgeDays", days.to_string()));
        }

        debug!(query, page_size, ?max_age_days, "Fact-check search");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            // 403 means "no facts found" for this service, not a failure.
            403 => {
                debug!(query, "Fact-check search returned 403, treating as no results");
                return Ok(Vec::new());
            }
            503 => return Err(SearchError::Unavailable),
            s if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(SearchError::Api { status: s, body });
            }
            _ => {}
        }

        let data: FactCheckResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let results = self.parse_claims(data, page_size as usize);
        info!(query, count = results.len(), "Fact-check search complete");
        Ok(promote_whitelisted(results, usize::MAX))
    }
}

// ---------------------------------------------------------------------------
// Google Custom Search
// ---------------------------------------------------------------------------

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Custom Search API caps `num` at 10 per request.
const CUSTOM_SEARCH_MAX_NUM: u32 = 10;

pub struct GoogleWebSearchIndex {
    api_key: String,
    cx: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl GoogleWebSearchIndex {
    pub fn new(api_key: &str, cx: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            cx: cx.to_string(),
            client: reqwest::Client::builder()
                .timeout(SEARCH_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: CUSTOM_SEARCH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl WebSearchIndex for GoogleWebSearchIndex {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<EvidenceItem>, SearchError> {
        if self.api_key.is_empty() || self.cx.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query, count, "Web search");

        let num = count.min(CUSTOM_SEARCH_MAX_NUM).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cx.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: CustomSearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Malformed(e.to_string()))?;

        let results: Vec<EvidenceItem> = data
            .items
            .into_iter()
            .take(count as usize)
            .map(|item| {
                EvidenceItem::new(item.title, item.link, item.snippet, EvidenceSource::WebSearch)
            })
            .collect();

        info!(query, count = results.len(), "Web search complete");
        Ok(promote_whitelisted(results, usize::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str) -> EvidenceItem {
        EvidenceItem::new("t", url, "s", EvidenceSource::WebSearch)
    }

    #[test]
    fn test_is_whitelisted() {
        assert!(is_whitelisted("https://www.altnews.in/some-story"));
        assert!(is_whitelisted("https://www.thequint.com/fact-check/x"));
        assert!(!is_whitelisted("https://www.thequint.com/sports/x"));
        assert!(!is_whitelisted("https://example.com"));
    }

    #[test]
    fn test_promote_whitelisted_moves_to_front() {
        let items = vec![
            item("https://example.com/a"),
            item("https://boomlive.in/check"),
            item("https://example.com/b"),
        ];
        let promoted = promote_whitelisted(items, usize::MAX);
        assert_eq!(promoted[0].url, "https://boomlive.in/check");
        assert_eq!(promoted[1].url, "https://example.com/a");
        assert_eq!(promoted[2].url, "https://example.com/b");
    }

    #[test]
    fn test_promote_whitelisted_respects_cap() {
        let items = vec![
            item("https://example.com/a"),
            item("https://boomlive.in/1"),
            item("https://altnews.in/2"),
            item("https://factly.in/3"),
            item("https://factcrescendo.com/4"),
        ];
        let promoted = promote_whitelisted(items, WHITELIST_TOP_SLOTS);
        // Three whitelisted lead, the fourth follows them, then the rest.
        assert!(is_whitelisted(&promoted[0].url));
        assert!(is_whitelisted(&promoted[1].url));
        assert!(is_whitelisted(&promoted[2].url));
        assert_eq!(promoted[3].url, "https://factcrescendo.com/4");
        assert_eq!(promoted[4].url, "https://example.com/a");
    }

    #[test]
    fn test_parse_claims_maps_reviews() {
        let index = GoogleFactCheckIndex::new("k");
        let response = FactCheckResponse {
            claims: vec![FactCheckClaim {
                text: "Vaccines cause autism".to_string(),
                claimant: "someone".to_string(),
                claim_review: vec![ClaimReview {
                    url: "https://factcheck.org/review".to_string(),
                    textual_rating: "False".to_string(),
                    publisher: Some(Publisher {
                        name: "FactCheck.org".to_string(),
                    }),
                }],
            }],
        };
        let items = index.parse_claims(response, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://factcheck.org/review");
        assert_eq!(items[0].snippet, "False");
        assert_eq!(items[0].source, EvidenceSource::FactCheckApi);
    }

    #[test]
    fn test_parse_claims_falls_back_to_claimant_url() {
        let index = GoogleFactCheckIndex::new("k");
        let response = FactCheckResponse {
            claims: vec![FactCheckClaim {
                text: String::new(),
                claimant: "https://claimant.example".to_string(),
                claim_review: vec![],
            }],
        };
        let items = index.parse_claims(response, 5);
        assert_eq!(items[0].url, "https://claimant.example");
        assert_eq!(items[0].title, "Fact Check");
    }
}

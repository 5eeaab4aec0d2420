// Multi-source evidence retrieval: per-query fact-check retry ladder, web
// search, cross-source merge, URL dedup, whitelist promotion.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use claimtrace_common::{normalize_url, EvidenceItem};

use crate::search::{promote_whitelisted, WHITELIST_TOP_SLOTS};
use crate::traits::{FactCheckIndex, SearchError, WebSearchIndex};

/// At most this many generated queries are executed per claim.
const MAX_QUERIES_PER_CLAIM: usize = 3;
/// Results requested from each source per query.
const RESULTS_PER_SOURCE: u32 = 5;
/// Backoff before retrying a rung that hit a 503.
const UNAVAILABLE_BACKOFF: Duration = Duration::from_millis(500);

/// Stop words stripped when simplifying a query for the last ladder rung.
const SIMPLIFY_STOP_WORDS: &[&str] = &[
    "is", "are", "was", "were", "the", "that", "because", "do", "does", "did", "a", "an", "and",
    "or", "but", "in", "on", "at", "to", "for", "of", "with", "have", "has", "had", "will",
    "would", "could", "should", "may", "might", "this", "these", "those", "they", "them",
    "their", "there",
];

/// One rung of the fact-check retry ladder. Rungs are tried in order until
/// one yields results; exhausting the list yields an empty result, never an
/// error.
#[derive(Debug, Clone, Copy)]
struct Attempt {
    page_size: u32,
    max_age_days: Option<u32>,
    simplify: bool,
    description: &'static str,
}

const FACT_CHECK_LADDER: &[Attempt] = &[
    Attempt {
        page_size: 5,
        max_age_days: Some(365),
        simplify: false,
        description: "original query with date filter",
    },
    Attempt {
        page_size: 5,
        max_age_days: None,
        simplify: false,
        description: "without date limit",
    },
    Attempt {
        page_size: 3,
        max_age_days: None,
        simplify: true,
        description: "simplified query (no stopwords)",
    },
];

/// Remove stop words to create a simpler query. Falls back to the original
/// text when stripping removes everything.
pub fn simplify_query(query: &str) -> String {
    let stop_words: HashSet<&str> = SIMPLIFY_STOP_WORDS.iter().copied().collect();
    let simplified = query
        .split_whitespace()
        .filter(|w| !stop_words.contains(w.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ");
    if simplified.is_empty() {
        query.to_string()
    } else {
        simplified
    }
}

/// Drop items whose normalized URL was already seen. First occurrence wins,
/// arrival order preserved. Items with empty URLs are dropped since they
/// cannot be cited or crawled.
pub fn dedupe_by_url(items: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| !item.url.is_empty() && seen.insert(normalize_url(&item.url)))
        .collect()
}

/// Evidence gathered for one claim across all queries and sources.
#[derive(Debug, Default)]
pub struct RetrievedEvidence {
    pub items: Vec<EvidenceItem>,
    /// Whether the fact-check source produced any results at all. Feeds
    /// the confidence adjustment during synthesis.
    pub fact_check_hit: bool,
}

pub struct EvidenceRetriever {
    fact_check: Arc<dyn FactCheckIndex>,
    web: Arc<dyn WebSearchIndex>,
}

impl EvidenceRetriever {
    pub fn new(fact_check: Arc<dyn FactCheckIndex>, web: Arc<dyn WebSearchIndex>) -> Self {
        Self { fact_check, web }
    }

    /// Gather evidence for the given queries. Total: source failures
    /// degrade to fewer results, and the output is deduplicated by
    /// normalized URL with whitelisted domains leading.
    pub async fn retrieve(&self, queries: &[String]) -> RetrievedEvidence {
        let mut all = Vec::new();
        let mut fact_check_hit = false;

        for query in queries.iter().take(MAX_QUERIES_PER_CLAIM) {
            let fc_results = self.fact_check_with_ladder(query).await;
            if !fc_results.is_empty() {
                fact_check_hit = true;
            }
            all.extend(fc_results);

            match self.web.search(query, RESULTS_PER_SOURCE).await {
                Ok(results) => all.extend(results),
                Err(e) => {
                    warn!(query, error = %e, "Web search failed, continuing without it");
                }
            }
        }

        let deduped = dedupe_by_url(all);
        let items = promote_whitelisted(deduped, WHITELIST_TOP_SLOTS);

        info!(
            count = items.len(),
            fact_check_hit, "Evidence retrieval complete"
        );

        RetrievedEvidence {
            items,
            fact_check_hit,
        }
    }

    /// Walk the retry ladder for one query. A rung advances on an empty
    /// result or an error; a 503 gets one backoff retry of the same rung
    /// first, since unavailability is not a signal to change strategy.
    async fn fact_check_with_ladder(&self, query: &str) -> Vec<EvidenceItem> {
        for (idx, attempt) in FACT_CHECK_LADDER.iter().enumerate() {
            let rung_query = if attempt.simplify {
                simplify_query(query)
            } else {
                query.to_string()
            };

            debug!(
                attempt = idx + 1,
                description = attempt.description,
                query = rung_query.as_str(),
                "Fact-check ladder attempt"
            );

            let mut retried_unavailable = false;
            loop {
                match self
                    .fact_check
                    .search(&rung_query, attempt.page_size, attempt.max_age_days)
                    .await
                {
                    Ok(results) if !results.is_empty() => {
                        debug!(
                            attempt = idx + 1,
                            count = results.len(),
                            "Fact-check ladder success"
                        );
                        return results;
                    }
                    Ok(_) => break, // no results, next rung
                    Err(SearchError::Unavailable) if !retried_unavailable => {
                        warn!(
                            attempt = idx + 1,
                            query = rung_query.as_str(),
                            "Fact-check source unavailable, backing off and retrying rung"
                        );
                        retried_unavailable = true;
                        tokio::time::sleep(UNAVAILABLE_BACKOFF).await;
                    }
                    Err(e) => {
                        warn!(
                            attempt = idx + 1,
                            query = rung_query.as_str(),
                            error = %e,
                            "Fact-check ladder attempt failed"
                        );
                        break;
                    }
                }
            }
        }

        debug!(query, "Fact-check ladder exhausted with no results");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFactCheckIndex, MockWebSearchIndex};
    use claimtrace_common::EvidenceSource;

    fn item(url: &str, source: EvidenceSource) -> EvidenceItem {
        EvidenceItem::new("title", url, "snippet", source)
    }

    #[test]
    fn test_simplify_query_strips_stop_words() {
        assert_eq!(
            simplify_query("the earth is flat because of this"),
            "earth flat"
        );
    }

    #[test]
    fn test_simplify_query_keeps_original_when_all_stopwords() {
        assert_eq!(simplify_query("is the that"), "is the that");
    }

    #[test]
    fn test_dedupe_by_url_first_wins() {
        let items = vec![
            item("https://a.com/x", EvidenceSource::FactCheckApi),
            item("https://a.com/x/", EvidenceSource::WebSearch),
            item("https://a.com/x#frag", EvidenceSource::WebSearch),
            item("https://b.com/y", EvidenceSource::WebSearch),
        ];
        let deduped = dedupe_by_url(items);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].source, EvidenceSource::FactCheckApi);
        assert_eq!(deduped[1].url, "https://b.com/y");
    }

    #[test]
    fn test_dedupe_drops_empty_urls() {
        let items = vec![
            item("", EvidenceSource::FactCheckApi),
            item("https://a.com", EvidenceSource::WebSearch),
        ];
        assert_eq!(dedupe_by_url(items).len(), 1);
    }

    #[tokio::test]
    async fn test_ladder_403_403_success() {
        // Rungs 1 and 2 come back empty (the adapter maps 403 to empty);
        // rung 3 succeeds. The retriever must return rung-3 results.
        let fc = MockFactCheckIndex::new().with_script(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![item("https://factcheck.org/hit", EvidenceSource::FactCheckApi)]),
        ]);
        let web = MockWebSearchIndex::new();
        let retriever = EvidenceRetriever::new(Arc::new(fc), Arc::new(web));

        let result = retriever.retrieve(&["some query".to_string()]).await;
        assert!(result.fact_check_hit);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].url, "https://factcheck.org/hit");
    }

    #[tokio::test]
    async fn test_ladder_exhaustion_yields_empty_not_error() {
        let fc = MockFactCheckIndex::new().with_script(vec![
            Err(SearchError::Api {
                status: 500,
                body: "boom".to_string(),
            }),
            Ok(vec![]),
            Err(SearchError::Transport("timeout".to_string())),
        ]);
        let web = MockWebSearchIndex::new();
        let retriever = EvidenceRetriever::new(Arc::new(fc), Arc::new(web));

        let result = retriever.retrieve(&["q".to_string()]).await;
        assert!(!result.fact_check_hit);
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_rung_is_retried_before_advancing() {
        // 503, then success on the same rung's retry.
        let fc = Arc::new(MockFactCheckIndex::new().with_script(vec![
            Err(SearchError::Unavailable),
            Ok(vec![item("https://factcheck.org/hit", EvidenceSource::FactCheckApi)]),
        ]));
        let web = MockWebSearchIndex::new();
        let retriever = EvidenceRetriever::new(fc.clone(), Arc::new(web));

        let result = retriever.retrieve(&["q".to_string()]).await;
        assert_eq!(result.items.len(), 1);
        // The retry consumed the second scripted response on the same rung;
        // the ladder never advanced to rung 2.
        assert_eq!(fc.calls(), 2);
    }

    #[tokio::test]
    async fn test_web_failure_does_not_abort() {
        let fc = MockFactCheckIndex::new().with_script(vec![Ok(vec![item(
            "https://factcheck.org/a",
            EvidenceSource::FactCheckApi,
        )])]);
        let web = MockWebSearchIndex::new().always_fail();
        let retriever = EvidenceRetriever::new(Arc::new(fc), Arc::new(web));

        let result = retriever.retrieve(&["q".to_string()]).await;
        assert_eq!(result.items.len(), 1);
    }

    #[tokio::test]
    async fn test_cross_source_merge_dedups_and_promotes() {
        let fc = MockFactCheckIndex::new().with_script(vec![Ok(vec![item(
            "https://example.com/shared",
            EvidenceSource::FactCheckApi,
        )])]);
        let web = MockWebSearchIndex::new().with_results(
            "q",
            vec![
                item("https://example.com/shared", EvidenceSource::WebSearch),
                item("https://boomlive.in/wl", EvidenceSource::WebSearch),
                item("https://other.com/z", EvidenceSource::WebSearch),
            ],
        );
        let retriever = EvidenceRetriever::new(Arc::new(fc), Arc::new(web));

        let result = retriever.retrieve(&["q".to_string()]).await;
        // shared URL deduped (fact-check arrival wins), whitelist leads.
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].url, "https://boomlive.in/wl");
        assert_eq!(result.items[1].source, EvidenceSource::FactCheckApi);
    }

    #[tokio::test]
    async fn test_queries_capped_at_three() {
        let fc = MockFactCheckIndex::new(); // empty script: every rung empty
        let web = MockWebSearchIndex::new();
        let retriever = EvidenceRetriever::new(Arc::new(fc), Arc::new(web));

        let queries: Vec<String> = (0..6).map(|i| format!("q{i}")).collect();
        let result = retriever.retrieve(&queries).await;
        assert!(result.items.is_empty());
    }
}

// The pipeline orchestrator: language normalization, claim extraction, the
// per-claim evidence loop, and document-level aggregation.
//
// No single-claim failure aborts the batch: every stage has a total
// fallback, so the analyzer always produces a well-formed AnalysisResult.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ai_client::{Gemini, LanguageModel};
use claimtrace_common::text::truncate_chars;
use claimtrace_common::{
    normalize_url, AnalysisResult, Claim, ClaimVerdict, Config, EvidenceSource, LanguageInfo,
    Verdict,
};

use crate::claim_extractor::ClaimExtractor;
use crate::fetcher::HttpFetcher;
use crate::language::{GoogleLanguageDetector, GoogleTranslator, NoopDetector, NoopTranslator};
use crate::query_gen::QueryGenerator;
use crate::ranker::{EvidenceRanker, MAX_SELECTED};
use crate::retriever::EvidenceRetriever;
use crate::search::{GoogleFactCheckIndex, GoogleWebSearchIndex};
use crate::synthesizer::{EvidenceBuckets, VerdictSynthesizer};
use crate::traits::{FactCheckIndex, LanguageDetector, PageFetcher, Translator, WebSearchIndex};

/// At most this many extracted claims are analyzed per document.
const MAX_CLAIMS_ANALYZED: usize = 5;
/// Content is crawled for at most this many evidence items per claim.
const MAX_CRAWLED_SOURCES: usize = 10;
/// Crawled text attached to an evidence item is capped at this many chars.
const CRAWLED_TEXT_CAP: usize = 1000;
/// Surrounding-context budget for the synthesis prompt.
const CONTEXT_CAP: usize = 500;

const METHODOLOGY: &str = "claimtrace extracts factual claims from text with a language model, \
searches verified fact-checking sources and the general web, crawls source content, ranks \
evidence by relevance and source authority, and synthesizes verdicts with confidence scores. \
Citations link to original fact-check articles and sources.";

const LIMITATIONS: &str = "Fact-checking accuracy depends on: (1) availability of relevant \
sources in the fact-check index and search results, (2) recency of information (new claims may \
lack verification), (3) model interpretation quality, and (4) source reliability. Always review \
citations for complete context. Some claims may require expert review.";

pub const NO_TEXT_SUMMARY: &str =
    "No analyzable text found. Please select at least 10 characters.";
pub const NO_CLAIMS_SUMMARY: &str = "No factual claims detected in the selected text.";
pub const FETCH_FAILED_SUMMARY: &str =
    "Could not fetch URL content. Please check if the URL is accessible and try again.";
pub const EMPTY_URL_TEXT_SUMMARY: &str = "No analyzable text content found in URL. The page may \
be empty, contain only images, or be inaccessible.";

pub struct Analyzer {
    extractor: ClaimExtractor,
    query_gen: QueryGenerator,
    retriever: EvidenceRetriever,
    fetcher: Arc<dyn PageFetcher>,
    synthesizer: VerdictSynthesizer,
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
}

impl Analyzer {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        fact_check: Arc<dyn FactCheckIndex>,
        web: Arc<dyn WebSearchIndex>,
        fetcher: Arc<dyn PageFetcher>,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            extractor: ClaimExtractor::new(model.clone()),
            query_gen: QueryGenerator::new(model.clone()),
            retriever: EvidenceRetriever::new(fact_check, web),
            fetcher,
            synthesizer: VerdictSynthesizer::new(model),
            detector,
            translator,
        }
    }

    /// Wire up the production capabilities from configuration.
    pub fn from_config(config: &Config) -> Self {
        let model: Arc<dyn LanguageModel> =
            Arc::new(Gemini::new(&config.google_api_key, &config.model));

        let (detector, translator): (Arc<dyn LanguageDetector>, Arc<dyn Translator>) =
            match config.translate_api_key.as_deref() {
                Some(key) if !key.is_empty() => (
                    Arc::new(GoogleLanguageDetector::new(key)),
                    Arc::new(GoogleTranslator::new(key)),
                ),
                _ => (Arc::new(NoopDetector), Arc::new(NoopTranslator)),
            };

        Self::new(
            model,
            Arc::new(GoogleFactCheckIndex::new(&config.fact_check_api_key)),
            Arc::new(GoogleWebSearchIndex::new(
                &config.search_api_key,
                &config.search_cx,
            )),
            Arc::new(HttpFetcher::new(
                config.request_timeout_secs,
                config.max_retries,
            )),
            detector,
            translator,
        )
    }

    /// Analyze text and fact-check its claims.
    pub async fn analyze_text(&self, text: &str, cancel: &CancellationToken) -> AnalysisResult {
        if text.trim().len() < 10 {
            return fixed_result(NO_TEXT_SUMMARY, None);
        }

        // Normalize the language before extraction so claims, queries, and
        // evidence all operate on English text.
        let detected = self.detector.detect(text).await;
        let (text, language) = if detected != "en" {
            info!(language = detected.as_str(), "Non-English input, translating");
            let translated = self.translator.translate_to_english(text).await;
            let language = LanguageInfo {
                detected_language: detected,
                original_text: text.to_string(),
                translated_text: translated.clone(),
            };
            (translated, Some(language))
        } else {
            (text.to_string(), None)
        };

        let claims = self.extractor.extract(&text).await;
        if claims.is_empty() {
            return fixed_result(NO_CLAIMS_SUMMARY, language);
        }

        info!(count = claims.len(), "Claims extracted, starting evidence loop");

        let context = truncate_chars(&text, CONTEXT_CAP);
        let mut verdicts = Vec::new();

        for claim in claims.iter().take(MAX_CLAIMS_ANALYZED) {
            if cancel.is_cancelled() {
                warn!("Analysis cancelled, returning partial results");
                break;
            }
            verdicts.push(self.analyze_claim(claim, &context, cancel).await);
        }

        let summary = compose_summary(&verdicts);

        AnalysisResult {
            claims: verdicts,
            summary,
            methodology: METHODOLOGY.to_string(),
            limitations: LIMITATIONS.to_string(),
            source_title: None,
            source_description: None,
            language,
        }
    }

    /// Fact-check the content behind a URL (HTML or PDF).
    pub async fn analyze_url(&self, url: &str, cancel: &CancellationToken) -> AnalysisResult {
        let Some(page) = self.fetcher.fetch(url).await else {
            return fixed_result(FETCH_FAILED_SUMMARY, None);
        };

        if !page.has_text() {
            return fixed_result(EMPTY_URL_TEXT_SUMMARY, None);
        }

        let mut result = self.analyze_text(&page.text, cancel).await;
        if !page.title.is_empty() {
            result.source_title = Some(page.title);
        }
        if !page.description.is_empty() {
            result.source_description = Some(page.description);
        }
        result
    }

    /// One claim through the full evidence loop: queries → retrieval →
    /// crawl enrichment → ranking → synthesis.
    async fn analyze_claim(
        &self,
        claim: &Claim,
        context: &str,
        cancel: &CancellationToken,
    ) -> ClaimVerdict {
        let queries = self.query_gen.generate(&claim.text, claim.claim_type).await;
        let retrieved = self.retriever.retrieve(&queries).await;
        let fact_check_hit = retrieved.fact_check_hit;
        let mut items = retrieved.items;

        // Crawl the top sources and attach their text. A failed fetch keeps
        // the un-crawled item, whose snippet still counts as evidence.
        let to_crawl: Vec<String> = items
            .iter()
            .take(MAX_CRAWLED_SOURCES)
            .map(|item| item.url.clone())
            .collect();
        let pages = self.fetcher.fetch_all(&to_crawl, cancel).await;
        let by_url: HashMap<String, &str> = pages
            .iter()
            .map(|page| (page.url.clone(), page.text.as_str()))
            .collect();

        for item in items.iter_mut().take(MAX_CRAWLED_SOURCES) {
            if let Some(text) = by_url.get(&normalize_url(&item.url)) {
                if !text.is_empty() {
                    item.crawled_text = Some(truncate_chars(text, CRAWLED_TEXT_CAP));
                }
            }
        }

        let ranked = EvidenceRanker::rank(&claim.text, items.clone());
        let top = EvidenceRanker::select(&ranked, MAX_SELECTED);

        // Stage-3 sees the raw evidence partitioned by source type.
        let buckets = EvidenceBuckets {
            fact_check: items
                .iter()
                .filter(|i| i.source == EvidenceSource::FactCheckApi)
                .cloned()
                .collect(),
            crawled: items
                .iter()
                .filter(|i| i.crawled_text.is_some())
                .cloned()
                .collect(),
            snippets: items
                .iter()
                .filter(|i| i.source == EvidenceSource::WebSearch && i.crawled_text.is_none())
                .cloned()
                .collect(),
        };

        self.synthesizer
            .synthesize(&claim.text, context, &top, &buckets, fact_check_hit)
            .await
    }
}

fn fixed_result(summary: &str, language: Option<LanguageInfo>) -> AnalysisResult {
    AnalysisResult {
        claims: Vec::new(),
        summary: summary.to_string(),
        methodology: METHODOLOGY.to_string(),
        limitations: LIMITATIONS.to_string(),
        source_title: None,
        source_description: None,
        language,
    }
}

/// Compose the document summary sentence from verdict counts.
fn compose_summary(verdicts: &[ClaimVerdict]) -> String {
    let total = verdicts.len();
    if total == 0 {
        return "No claims analyzed.".to_string();
    }

    let count = |v: Verdict| verdicts.iter().filter(|c| c.verdict == v).count();

    let mut parts = vec![format!(
        "Analyzed {total} claim{}",
        if total == 1 { "" } else { "s" }
    )];
    let true_count = count(Verdict::True);
    if true_count > 0 {
        parts.push(format!("{true_count} verified as true"));
    }
    let false_count = count(Verdict::False);
    if false_count > 0 {
        parts.push(format!("{false_count} verified as false"));
    }
    let misleading_count = count(Verdict::Misleading);
    if misleading_count > 0 {
        parts.push(format!("{misleading_count} found to be misleading"));
    }
    let no_info_count = count(Verdict::NoInfo);
    if no_info_count > 0 {
        parts.push(format!("{no_info_count} could not be verified"));
    }

    format!("{}.", parts.join(". "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(v: Verdict) -> ClaimVerdict {
        ClaimVerdict {
            claim: "c".to_string(),
            verdict: v,
            confidence: 0.5,
            explanation: String::new(),
            citations: Vec::new(),
            final_score: 50,
            final_verdict: claimtrace_common::FinalVerdictLabel::Uncertain,
            final_reasoning: String::new(),
            final_citations: Vec::new(),
        }
    }

    #[test]
    fn test_compose_summary_counts_categories() {
        let verdicts = vec![
            verdict(Verdict::True),
            verdict(Verdict::True),
            verdict(Verdict::False),
            verdict(Verdict::NoInfo),
        ];
        assert_eq!(
            compose_summary(&verdicts),
            "Analyzed 4 claims. 2 verified as true. 1 verified as false. 1 could not be verified."
        );
    }

    #[test]
    fn test_compose_summary_singular() {
        assert_eq!(
            compose_summary(&[verdict(Verdict::Misleading)]),
            "Analyzed 1 claim. 1 found to be misleading."
        );
    }

    #[test]
    fn test_compose_summary_empty() {
        assert_eq!(compose_summary(&[]), "No claims analyzed.");
    }
}

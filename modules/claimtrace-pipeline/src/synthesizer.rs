// Two-stage verdict synthesis.
//
// Stage 1 judges the claim against the top-ranked evidence snippets. Stage 3
// independently scores the claim 0-100 against all raw evidence partitioned
// by source type. Both stages are always attempted and a failure in either
// degrades to a documented fallback, so the merged ClaimVerdict is total.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{de, Deserialize};
use thiserror::Error;
use tracing::{info, warn};

use ai_client::{LanguageModel, ModelError};
use claimtrace_common::text::truncate_chars;
use claimtrace_common::{
    ClaimVerdict, ConfidenceLevel, EvidenceItem, FinalVerdictLabel, RankedEvidence, SourceTier,
    Verdict,
};

/// Stage-1 prompt carries at most this many evidence snippets.
const MAX_PROMPT_SNIPPETS: usize = 10;
/// Stage-3 buckets are capped at this many items each.
const MAX_BUCKET_ITEMS: usize = 5;
/// Citations are capped at this many URLs.
const MAX_CITATIONS: usize = 5;
/// Adjusted confidence never drops below this floor.
const CONFIDENCE_FLOOR: f32 = 0.1;

const SYNTHESIS_SYSTEM: &str = "\
You are a fact-checking assistant. Your task is to analyze claims and provide \
structured JSON responses only.

You must respond with valid JSON only. Do not include any markdown formatting, \
code blocks, or explanatory text outside the JSON.

When fact-checking:
- \"true\": Claim is verified as factually correct
- \"false\": Claim is verified as factually incorrect
- \"partially_true\": Claim is misleading or partially true
- \"unverified\": Cannot determine with available information

Always return confidence scores between 0.0 and 1.0.";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("synthesis response could not be decoded: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Decoded stage outputs
// ---------------------------------------------------------------------------

/// Stage-1 result after decoding and verdict mapping.
#[derive(Debug, Clone)]
pub struct EvidenceVerdict {
    pub verdict: Verdict,
    pub confidence: f32,
    pub explanation: String,
    pub evidence: String,
}

impl EvidenceVerdict {
    /// The documented stage-1 fallback.
    pub fn fallback() -> Self {
        Self {
            verdict: Verdict::NoInfo,
            confidence: 0.0,
            explanation: "Could not verify claim due to analysis error.".to_string(),
            evidence: String::new(),
        }
    }
}

/// Stage-3 result after decoding, clamping, and label normalization.
#[derive(Debug, Clone)]
pub struct FinalVerdict {
    pub score: u8,
    pub verdict: FinalVerdictLabel,
    pub confidence: ConfidenceLevel,
    pub reasoning: String,
    pub citations: Vec<String>,
}

impl FinalVerdict {
    /// The fixed fallback when both stages failed.
    pub fn fallback() -> Self {
        Self {
            score: 50,
            verdict: FinalVerdictLabel::Uncertain,
            confidence: ConfidenceLevel::Low,
            reasoning: "Could not generate AI-verified final verdict. Showing evidence-only result."
                .to_string(),
            citations: Vec::new(),
        }
    }
}

/// Raw evidence partitioned by source type for the stage-3 prompt.
#[derive(Debug, Default)]
pub struct EvidenceBuckets {
    pub fact_check: Vec<EvidenceItem>,
    pub crawled: Vec<EvidenceItem>,
    pub snippets: Vec<EvidenceItem>,
}

// ---------------------------------------------------------------------------
// Lenient wire decoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, JsonSchema)]
struct RawEvidenceVerdict {
    #[serde(default)]
    verdict: String,
    #[serde(default, deserialize_with = "lenient_f32")]
    confidence: f32,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    evidence: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RawFinalVerdict {
    #[serde(default = "default_score", deserialize_with = "lenient_i64")]
    score: i64,
    #[serde(default)]
    verdict: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    citations: Vec<String>,
}

fn default_score() -> i64 {
    50
}

/// Accept a JSON number or numeric string.
fn lenient_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0) as f32),
        serde_json::Value::String(s) => Ok(s.trim().parse().unwrap_or(0.0)),
        serde_json::Value::Null => Ok(0.0),
        _ => Err(de::Error::custom("expected a number")),
    }
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or(50.0).round() as i64),
        serde_json::Value::String(s) => Ok(s.trim().parse().unwrap_or(50)),
        serde_json::Value::Null => Ok(50),
        _ => Err(de::Error::custom("expected a number")),
    }
}

/// Accept an array of strings; anything else decodes as empty.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn map_verdict(raw: &str) -> Verdict {
    match raw.trim().to_lowercase().as_str() {
        "true" => Verdict::True,
        "false" => Verdict::False,
        "partially_true" => Verdict::Misleading,
        _ => Verdict::NoInfo,
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

pub struct VerdictSynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl VerdictSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Run both stages and merge into one `ClaimVerdict`. Total: every
    /// failure path lands on a documented fallback.
    pub async fn synthesize(
        &self,
        claim: &str,
        context: &str,
        top_evidence: &[RankedEvidence],
        buckets: &EvidenceBuckets,
        fact_check_hit: bool,
    ) -> ClaimVerdict {
        let citations: Vec<String> = top_evidence
            .iter()
            .map(|e| e.item.url.clone())
            .filter(|u| !u.is_empty())
            .collect();

        let (stage1, stage1_ok) = match self.evidence_verdict(claim, context, top_evidence).await {
            Ok(v) => (v, true),
            Err(e) => {
                warn!(claim = truncate_chars(claim, 50).as_str(), error = %e, "Evidence verdict failed, using fallback");
                (EvidenceVerdict::fallback(), false)
            }
        };

        let confidence = adjust_confidence(stage1.confidence, fact_check_hit, !citations.is_empty());

        let final_verdict = match self.final_verdict(claim, buckets).await {
            Ok(v) => {
                info!(
                    claim = truncate_chars(claim, 50).as_str(),
                    score = v.score,
                    verdict = ?v.verdict,
                    "Final verdict generated"
                );
                v
            }
            Err(e) => {
                warn!(claim = truncate_chars(claim, 50).as_str(), error = %e, "Final verdict failed, using evidence-only result");
                if stage1_ok {
                    // Stage 1 survived: reuse its judgment instead of the
                    // fixed uncertain record.
                    FinalVerdict {
                        score: (confidence * 100.0).round().clamp(0.0, 100.0) as u8,
                        verdict: verdict_to_label(stage1.verdict),
                        confidence: ConfidenceLevel::Medium,
                        reasoning: stage1.explanation.clone(),
                        citations: citations.iter().take(MAX_CITATIONS).cloned().collect(),
                    }
                } else {
                    FinalVerdict::fallback()
                }
            }
        };

        ClaimVerdict {
            claim: claim.to_string(),
            verdict: stage1.verdict,
            confidence: (confidence * 100.0).round() / 100.0,
            explanation: stage1.explanation,
            citations,
            final_score: final_verdict.score,
            final_verdict: final_verdict.verdict,
            final_reasoning: final_verdict.reasoning,
            final_citations: final_verdict.citations,
        }
    }

    /// Stage 1: verdict from the top-ranked evidence snippets.
    pub async fn evidence_verdict(
        &self,
        claim: &str,
        context: &str,
        evidence: &[RankedEvidence],
    ) -> Result<EvidenceVerdict, SynthesisError> {
        let mut evidence_text = String::new();
        if !evidence.is_empty() {
            evidence_text.push_str("\n\nEvidence Snippets (ranked by relevance and source authority):\n");
            for (i, ranked) in evidence.iter().take(MAX_PROMPT_SNIPPETS).enumerate() {
                let priority_label = match ranked.tier {
                    SourceTier::FactCheck => " [FACT-CHECK - Highest Priority]",
                    SourceTier::Authoritative => " [Authoritative Source - Gov/Edu/News]",
                    SourceTier::Other => "",
                };
                evidence_text.push_str(&format!(
                    "{}. Source: {:?}{}\n   URL: {}\n   Snippet: {}\n   Relevance Score: {:.2}\n\n",
                    i + 1,
                    ranked.item.source,
                    priority_label,
                    ranked.item.url,
                    truncate_chars(ranked.item.body_text(), 400),
                    ranked.relevance_score,
                ));
            }
        }

        let context_text = if context.is_empty() {
            String::new()
        } else {
            format!("\nOriginal Context: {}", truncate_chars(context, 500))
        };

        let prompt = format!(
            r#"Fact-check the following claim based on the provided evidence snippets.

Claim: "{claim}"{context_text}{evidence_text}

Analyze the evidence considering:
- Fact Check sources are highest priority
- Government, educational, and major news sources are authoritative
- URL credibility and snippet relevance

Provide a JSON object with:
{{
    "verdict": "true|false|partially_true|unverified",
    "confidence": 0.0-1.0,
    "explanation": "A clear 2-3 sentence explanation of your verdict, referencing specific URLs and snippets",
    "evidence": "Key supporting evidence from the snippets, include URL references where relevant"
}}

Return ONLY valid JSON, no markdown, no code blocks."#
        );

        let value = self
            .model
            .generate_json(SYNTHESIS_SYSTEM, &prompt, 0.1)
            .await?;

        let raw: RawEvidenceVerdict = serde_json::from_value(value)
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        Ok(EvidenceVerdict {
            verdict: map_verdict(&raw.verdict),
            confidence: raw.confidence.clamp(0.0, 1.0),
            explanation: raw.explanation,
            evidence: raw.evidence,
        })
    }

    /// Stage 3: holistic 0-100 score from all raw evidence.
    pub async fn final_verdict(
        &self,
        claim: &str,
        buckets: &EvidenceBuckets,
    ) -> Result<FinalVerdict, SynthesisError> {
        let mut evidence_text = String::from("=== EVIDENCE SUMMARY ===\n\n");
        let mut any = false;

        if !buckets.fact_check.is_empty() {
            any = true;
            evidence_text.push_str("FACT-CHECK RESULTS (Highest Priority):\n");
            for (i, item) in buckets.fact_check.iter().take(MAX_BUCKET_ITEMS).enumerate() {
                evidence_text.push_str(&format!(
                    "{}. {}\n   URL: {}\n   Content: {}\n\n",
                    i + 1,
                    item.title,
                    item.url,
                    truncate_chars(&item.snippet, 300),
                ));
            }
        }

        if !buckets.crawled.is_empty() {
            any = true;
            evidence_text.push_str("\nCRAWLED ARTICLE CONTENT:\n");
            for (i, item) in buckets.crawled.iter().take(MAX_BUCKET_ITEMS).enumerate() {
                let excerpt = item.crawled_text.as_deref().unwrap_or(&item.snippet);
                evidence_text.push_str(&format!(
                    "{}. {} ({})\n   URL: {}\n   Excerpt: {}\n\n",
                    i + 1,
                    item.title,
                    claimtrace_common::extract_domain(&item.url),
                    item.url,
                    truncate_chars(excerpt, 400),
                ));
            }
        }

        if !buckets.snippets.is_empty() {
            any = true;
            evidence_text.push_str("\nSEARCH RESULT SNIPPETS:\n");
            for (i, item) in buckets.snippets.iter().take(MAX_BUCKET_ITEMS).enumerate() {
                evidence_text.push_str(&format!(
                    "{}. {} ({})\n   URL: {}\n   Snippet: {}\n\n",
                    i + 1,
                    item.title,
                    claimtrace_common::extract_domain(&item.url),
                    item.url,
                    truncate_chars(&item.snippet, 300),
                ));
            }
        }

        if !any {
            evidence_text = "No evidence found from any sources.".to_string();
        }

        let prompt = format!(
            r#"Analyze ALL provided evidence to generate a FINAL VERDICT for this claim.

CLAIM: "{claim}"

{evidence_text}

INSTRUCTIONS:
1. Analyze supporting vs contradicting sources
2. Weigh fact-check results HIGHEST (they are verified fact-checks)
3. Evaluate domain authority: .gov, .edu, major news outlets (Reuters, BBC, etc.) are more credible
4. Consider recency and source diversity
5. Compute a TRUTH SCORE (0-100 integer) where:
   - 90-100: TRUE (strong evidence from multiple authoritative sources)
   - 70-89: LIKELY TRUE (good evidence, may have minor contradictions)
   - 40-69: UNCERTAIN / MIXED (conflicting evidence or insufficient data)
   - 20-39: LIKELY FALSE (evidence suggests falsehood, but not definitive)
   - 0-19: FALSE (strong evidence contradicts the claim)

6. Assign verdict label: TRUE, LIKELY_TRUE, UNCERTAIN, LIKELY_FALSE, or FALSE
7. Provide confidence level: "high", "medium", or "low"
8. Write 3-5 sentence reasoning explaining your score, mentioning specific sources
9. List key citation URLs (up to 5 most important)

Return JSON only:
{{
  "score": 85,
  "verdict": "LIKELY_TRUE",
  "confidence": "high",
  "reasoning": "Detailed reasoning here...",
  "citations": ["https://example1.com", "https://example2.com"]
}}

Return ONLY valid JSON, no markdown, no code blocks."#
        );

        let value = self
            .model
            .generate_json(SYNTHESIS_SYSTEM, &prompt, 0.1)
            .await?;

        let raw: RawFinalVerdict = serde_json::from_value(value)
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;

        Ok(FinalVerdict {
            score: raw.score.clamp(0, 100) as u8,
            verdict: FinalVerdictLabel::parse(&raw.verdict),
            confidence: ConfidenceLevel::parse(&raw.confidence),
            reasoning: raw.reasoning,
            citations: raw.citations.into_iter().take(MAX_CITATIONS).collect(),
        })
    }
}

/// Lower confidence when the fact-check source came up empty: by 10% with no
/// citations at all, by 5% when other sources exist, floored at 0.1. The
/// verdict label itself is never downgraded on confidence alone.
pub fn adjust_confidence(base: f32, fact_check_hit: bool, has_citations: bool) -> f32 {
    if fact_check_hit {
        base
    } else if has_citations {
        (base * 0.95).max(CONFIDENCE_FLOOR)
    } else {
        (base * 0.9).max(CONFIDENCE_FLOOR)
    }
}

fn verdict_to_label(verdict: Verdict) -> FinalVerdictLabel {
    match verdict {
        Verdict::True => FinalVerdictLabel::True,
        Verdict::False => FinalVerdictLabel::False,
        // No final-verdict band maps to "misleading"; uncertain is closest.
        Verdict::Misleading | Verdict::NoInfo => FinalVerdictLabel::Uncertain,
    }
}

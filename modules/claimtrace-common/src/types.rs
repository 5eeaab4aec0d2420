use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Claims ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Statistical,
    Historical,
    Scientific,
    Event,
    General,
}

impl ClaimType {
    /// Lenient parse for model output; unknown labels become `General`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "statistical" => ClaimType::Statistical,
            "historical" => ClaimType::Historical,
            "scientific" => ClaimType::Scientific,
            "event" => ClaimType::Event,
            _ => ClaimType::General,
        }
    }
}

/// An extracted, independently verifiable factual statement.
/// Immutable after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub confidence: f32,
}

// --- Evidence ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    FactCheckApi,
    WebSearch,
    Crawled,
}

/// One retrieved document/snippet candidate for a claim. `url` is the
/// normalized form and acts as the unique key within a retrieval batch.
/// `crawled_text` is attached exactly once by the content fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: EvidenceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawled_text: Option<String>,
}

impl EvidenceItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: EvidenceSource,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source,
            crawled_text: None,
        }
    }

    /// Snippet or crawled body, whichever carries more signal.
    pub fn body_text(&self) -> &str {
        match self.crawled_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => &self.snippet,
        }
    }
}

/// Priority class of an evidence item's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    FactCheck,
    Authoritative,
    Other,
}

impl SourceTier {
    pub fn weight(&self) -> f32 {
        match self {
            SourceTier::FactCheck => 3.0,
            SourceTier::Authoritative => 2.0,
            SourceTier::Other => 1.0,
        }
    }
}

/// Evidence with its blended relevance/authority score. Read-only once
/// ranked; batches are ordered by `final_score` descending (stable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEvidence {
    pub item: EvidenceItem,
    pub relevance_score: f32,
    pub tier: SourceTier,
    pub final_score: f32,
    pub is_authoritative: bool,
}

// --- Verdicts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    True,
    False,
    Misleading,
    NoInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalVerdictLabel {
    True,
    LikelyTrue,
    Uncertain,
    LikelyFalse,
    False,
}

impl FinalVerdictLabel {
    /// Lenient parse for model output. `MIXED` and anything unrecognized
    /// normalize to `Uncertain`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "TRUE" => FinalVerdictLabel::True,
            "LIKELY_TRUE" => FinalVerdictLabel::LikelyTrue,
            "LIKELY_FALSE" => FinalVerdictLabel::LikelyFalse,
            "FALSE" => FinalVerdictLabel::False,
            _ => FinalVerdictLabel::Uncertain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => ConfidenceLevel::High,
            "low" => ConfidenceLevel::Low,
            _ => ConfidenceLevel::Medium,
        }
    }
}

/// Terminal per-claim result: the evidence verdict (stage 1, adjusted) and
/// the holistic final verdict (stage 3). Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim: String,
    pub verdict: Verdict,
    pub confidence: f32,
    pub explanation: String,
    pub citations: Vec<String>,
    pub final_score: u8,
    pub final_verdict: FinalVerdictLabel,
    pub final_reasoning: String,
    pub final_citations: Vec<String>,
}

// --- Analysis result ---

/// Present only when the input was not English.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub detected_language: String,
    pub original_text: String,
    pub translated_text: String,
}

/// Aggregate result for one analysis request. Built once, returned,
/// discarded; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub claims: Vec<ClaimVerdict>,
    pub summary: String,
    pub methodology: String,
    pub limitations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_description: Option<String>,
    #[serde(flatten)]
    pub language: Option<LanguageInfo>,
}

// --- Fetched pages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Html,
    Pdf,
}

/// Raw HTML is capped at this many characters in the returned record.
pub const MAX_STORED_HTML: usize = 50_000;

/// One fetched page with extracted readable text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
    pub html: String,
    pub content_type: PageKind,
}

impl FetchedPage {
    /// Whether enough text survived extraction to analyze.
    pub fn has_text(&self) -> bool {
        self.text.trim().len() >= 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_parse_known() {
        assert_eq!(ClaimType::parse("statistical"), ClaimType::Statistical);
        assert_eq!(ClaimType::parse("Historical"), ClaimType::Historical);
        assert_eq!(ClaimType::parse(" scientific "), ClaimType::Scientific);
    }

    #[test]
    fn test_claim_type_parse_unknown_defaults_general() {
        assert_eq!(ClaimType::parse("opinion"), ClaimType::General);
        assert_eq!(ClaimType::parse(""), ClaimType::General);
    }

    #[test]
    fn test_source_tier_weights() {
        assert_eq!(SourceTier::FactCheck.weight(), 3.0);
        assert_eq!(SourceTier::Authoritative.weight(), 2.0);
        assert_eq!(SourceTier::Other.weight(), 1.0);
    }

    #[test]
    fn test_final_verdict_label_parse() {
        assert_eq!(FinalVerdictLabel::parse("TRUE"), FinalVerdictLabel::True);
        assert_eq!(
            FinalVerdictLabel::parse("likely_true"),
            FinalVerdictLabel::LikelyTrue
        );
        assert_eq!(
            FinalVerdictLabel::parse("MIXED"),
            FinalVerdictLabel::Uncertain
        );
        assert_eq!(
            FinalVerdictLabel::parse("garbage"),
            FinalVerdictLabel::Uncertain
        );
    }

    #[test]
    fn test_confidence_level_parse() {
        assert_eq!(ConfidenceLevel::parse("high"), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::parse("unknown"), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_body_text_prefers_crawled() {
        let mut item = EvidenceItem::new("t", "https://e.com", "snippet", EvidenceSource::WebSearch);
        assert_eq!(item.body_text(), "snippet");
        item.crawled_text = Some("crawled body".to_string());
        assert_eq!(item.body_text(), "crawled body");
    }

    #[test]
    fn test_verdict_serialization() {
        assert_eq!(
            serde_json::to_string(&Verdict::NoInfo).unwrap(),
            "\"no_info\""
        );
        assert_eq!(
            serde_json::to_string(&FinalVerdictLabel::LikelyFalse).unwrap(),
            "\"LIKELY_FALSE\""
        );
    }
}

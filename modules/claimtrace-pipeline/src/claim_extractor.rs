use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{de, Deserialize};
use tracing::{debug, warn};

use ai_client::LanguageModel;
use claimtrace_common::{clean_text, Claim, ClaimType};

/// Claims are capped at this many per document.
const MAX_CLAIMS: usize = 10;
/// Fallback sentences shorter than this are discarded.
const MIN_SENTENCE_LEN: usize = 20;
/// Pattern-matched claims get this confidence.
const FALLBACK_CONFIDENCE: f32 = 0.5;

const EXTRACTION_SYSTEM: &str = "\
You are a fact-checking assistant. You extract verifiable factual claims and \
respond with valid JSON only. Do not include markdown formatting, code blocks, \
or explanatory text outside the JSON.";

/// What the model returns per extracted claim.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExtractedClaim {
    pub claim: String,
    /// Claim type: "statistical", "historical", "scientific", "event", or "general"
    #[serde(rename = "type", default)]
    pub claim_type: String,
    /// Confidence score 0-1
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub claims: Vec<ExtractedClaim>,
}

/// Accept confidence as a JSON number or a numeric string.
fn lenient_confidence<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0) as f32),
        serde_json::Value::String(s) => Ok(s.trim().parse().unwrap_or(0.0)),
        serde_json::Value::Null => Ok(0.0),
        _ => Err(de::Error::custom("confidence must be a number")),
    }
}

pub struct ClaimExtractor {
    model: Arc<dyn LanguageModel>,
}

impl ClaimExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Extract factual claims from text. Total: model failures fall back to
    /// pattern extraction and the result may be empty, but never an error.
    pub async fn extract(&self, text: &str) -> Vec<Claim> {
        if text.trim().len() < 10 {
            return Vec::new();
        }

        let cleaned = clean_text(text);

        match self.extract_with_model(&cleaned).await {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Claim extraction model call failed, using pattern fallback");
                extract_claims_fallback(&cleaned)
            }
        }
    }

    async fn extract_with_model(&self, text: &str) -> anyhow::Result<Vec<Claim>> {
        let prompt = format!(
            r#"Analyze the following text and extract all factual claims that can be fact-checked.

A claim is a statement that can be verified as true or false. Focus on:
- Statistical statements
- Historical facts
- Scientific claims
- Statements about events or people
- Claims about dates, numbers, or specific facts

Text to analyze:
{text}

Return a JSON object with a "claims" array, each entry having:
- "claim": the extracted claim text
- "type": the type of claim (statistical, historical, scientific, event, general)
- "confidence": confidence score (0-1)

Format: {{"claims": [{{"claim": "...", "type": "...", "confidence": 0.9}}]}}"#
        );

        let value = self
            .model
            .generate_json(EXTRACTION_SYSTEM, &prompt, 0.1)
            .await?;

        // Trust only a bare array or an object containing the claims array;
        // anything else is a malformed response and falls back.
        let response: ExtractionResponse = if value.is_array() {
            ExtractionResponse {
                claims: serde_json::from_value(value)?,
            }
        } else if value.get("claims").is_some() {
            serde_json::from_value(value)?
        } else {
            anyhow::bail!("model response is missing the claims array");
        };

        let claims: Vec<Claim> = response
            .claims
            .into_iter()
            .filter(|c| !c.claim.trim().is_empty())
            .map(|c| Claim {
                text: c.claim,
                claim_type: ClaimType::parse(&c.claim_type),
                confidence: c.confidence.clamp(0.0, 1.0),
            })
            .collect();

        debug!(count = claims.len(), "Claims extracted via model");
        Ok(claims)
    }
}

// ---------------------------------------------------------------------------
// Pattern fallback
// ---------------------------------------------------------------------------

struct TypePatterns {
    claim_type: ClaimType,
    patterns: Vec<Regex>,
}

fn type_patterns() -> &'static [TypePatterns] {
    static PATTERNS: OnceLock<Vec<TypePatterns>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).expect("valid regex"))
                .collect()
        };
        vec![
            TypePatterns {
                claim_type: ClaimType::Statistical,
                patterns: compile(&[
                    r"\d+%",
                    r"\d+\s+(percent|percentage|million|billion)",
                    r"(studies|research|data)\s+(show|indicate|suggest)",
                ]),
            },
            TypePatterns {
                claim_type: ClaimType::Historical,
                patterns: compile(&[
                    r"(in|on|during)\s+\d{4}",
                    r"(happened|occurred|took place)\s+(in|on)",
                ]),
            },
            TypePatterns {
                claim_type: ClaimType::Scientific,
                patterns: compile(&[
                    r"(research|study|scientists)\s+(find|found|discover)",
                    r"(proven|proves|evidence)\s+(that|shows)",
                    r"(cause|causes|caused)\s+\w+",
                ]),
            },
        ]
    })
}

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+|[.!?]$").expect("valid regex"))
}

/// Pattern-based extraction: split into sentences, match each against the
/// per-type regex families. A sentence matches at most one type; the first
/// family wins.
pub fn extract_claims_fallback(text: &str) -> Vec<Claim> {
    let mut claims = Vec::new();

    for sentence in sentence_split_re().split(text) {
        let sentence = sentence.trim();
        if sentence.len() < MIN_SENTENCE_LEN {
            continue;
        }

        for family in type_patterns() {
            if family.patterns.iter().any(|p| p.is_match(sentence)) {
                claims.push(Claim {
                    text: sentence.to_string(),
                    claim_type: family.claim_type,
                    confidence: FALLBACK_CONFIDENCE,
                });
                break;
            }
        }
        if claims.len() >= MAX_CLAIMS {
            break;
        }
    }

    claims.truncate(MAX_CLAIMS);
    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    #[tokio::test]
    async fn test_short_input_yields_no_claims() {
        let extractor = ClaimExtractor::new(Arc::new(MockModel::failing()));
        assert!(extractor.extract("   short  ").await.is_empty());
        assert!(extractor.extract("").await.is_empty());
    }

    #[tokio::test]
    async fn test_model_extraction_object_shape() {
        let model = MockModel::new().with_json(serde_json::json!({
            "claims": [
                {"claim": "The GDP grew 3% in 2020", "type": "statistical", "confidence": 0.9}
            ]
        }));
        let extractor = ClaimExtractor::new(Arc::new(model));
        let claims = extractor.extract("The GDP grew 3% in 2020. More text here.").await;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Statistical);
        assert!((claims[0].confidence - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_model_extraction_bare_array_shape() {
        let model = MockModel::new().with_json(serde_json::json!([
            {"claim": "Rome fell in 476", "type": "historical", "confidence": "0.8"}
        ]));
        let extractor = ClaimExtractor::new(Arc::new(model));
        let claims = extractor.extract("Rome fell in 476 according to the text.").await;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Historical);
        assert!((claims[0].confidence - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_unknown_type_and_out_of_range_confidence_are_coerced() {
        let model = MockModel::new().with_json(serde_json::json!({
            "claims": [{"claim": "Something happened", "type": "opinion", "confidence": 3.0}]
        }));
        let extractor = ClaimExtractor::new(Arc::new(model));
        let claims = extractor.extract("Something happened somewhere at some point.").await;
        assert_eq!(claims[0].claim_type, ClaimType::General);
        assert_eq!(claims[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_patterns() {
        let extractor = ClaimExtractor::new(Arc::new(MockModel::failing()));
        let claims = extractor
            .extract("COVID-19 vaccines cause autism. This is just filler text with no claim.")
            .await;
        assert!(!claims.is_empty());
        assert_eq!(claims[0].claim_type, ClaimType::Scientific);
        assert_eq!(claims[0].confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_fallback_statistical_pattern() {
        let claims = extract_claims_fallback(
            "Studies show that exercise helps. Unrelated short bit. The budget was 5 million dollars last year.",
        );
        assert!(claims.iter().any(|c| c.claim_type == ClaimType::Statistical));
    }

    #[test]
    fn test_fallback_skips_short_sentences() {
        let claims = extract_claims_fallback("In 1990. Yes. No.");
        assert!(claims.is_empty());
    }

    #[test]
    fn test_fallback_first_family_wins() {
        // Matches both statistical ("studies show") and scientific families;
        // statistical is checked first.
        let claims =
            extract_claims_fallback("Studies show the evidence that proves the hypothesis works.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim_type, ClaimType::Statistical);
    }

    #[test]
    fn test_fallback_caps_at_ten() {
        let text = (0..20)
            .map(|i| format!("In {} the empire expanded considerably across the region.", 1800 + i))
            .collect::<Vec<_>>()
            .join(" ");
        let claims = extract_claims_fallback(&text);
        assert_eq!(claims.len(), MAX_CLAIMS);
    }
}

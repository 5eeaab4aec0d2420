use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use ai_client::LanguageModel;
use claimtrace_common::ClaimType;

/// At most this many queries per claim.
const MAX_QUERIES: usize = 5;
/// Fallback keyword extraction keeps at most this many tokens.
const MAX_KEYWORDS: usize = 8;

const QUERY_SYSTEM: &str = "\
You are a fact-checking assistant. You produce concise web search queries and \
respond with valid JSON only. Do not include markdown formatting, code blocks, \
or explanatory text outside the JSON.";

/// Stop words removed during fallback keyword extraction.
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "is",
    "was", "are", "were", "been", "be", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "may", "might",
];

#[derive(Debug, Deserialize, JsonSchema)]
struct QueryResponse {
    #[serde(default)]
    queries: Vec<String>,
}

pub struct QueryGenerator {
    model: Arc<dyn LanguageModel>,
}

impl QueryGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Generate search queries for fact-checking a claim. Total: model
    /// failures fall back to keyword extraction.
    pub async fn generate(&self, claim: &str, claim_type: ClaimType) -> Vec<String> {
        if claim.trim().len() < 5 {
            return Vec::new();
        }

        match self.generate_with_model(claim, claim_type).await {
            Ok(queries) if !queries.is_empty() => queries,
            Ok(_) => {
                debug!("Model returned no queries, using keyword fallback");
                generate_queries_fallback(claim)
            }
            Err(e) => {
                warn!(error = %e, "Query generation model call failed, using keyword fallback");
                generate_queries_fallback(claim)
            }
        }
    }

    async fn generate_with_model(
        &self,
        claim: &str,
        claim_type: ClaimType,
    ) -> anyhow::Result<Vec<String>> {
        let type_label = serde_json::to_value(claim_type)?
            .as_str()
            .unwrap_or("general")
            .to_string();

        let prompt = format!(
            r#"Generate 3-5 simple, concise search queries to fact-check the following claim.

Claim: "{claim}"
Claim Type: {type_label}

Guidelines:
- Extract key factual elements only (keywords, names, numbers, places)
- Keep queries simple and short (3-7 words maximum)
- DO NOT include phrases like "fact check", "verified", or "snopes"
- Use keywords, not full sentences
- Focus on the core factual claim being made

Examples:
- Claim: "The Earth is flat" -> Query: "Earth flat"
- Claim: "COVID-19 vaccine causes autism" -> Query: "COVID vaccine autism"
- Claim: "NASA faked the moon landing" -> Query: "NASA moon landing"

Return a JSON object: {{"queries": ["query1", "query2", ...]}}"#
        );

        let value = self.model.generate_json(QUERY_SYSTEM, &prompt, 0.1).await?;

        // Accept either {"queries": [...]} or a bare array of strings.
        let queries = if value.is_array() {
            serde_json::from_value::<Vec<String>>(value)?
        } else {
            serde_json::from_value::<QueryResponse>(value)?.queries
        };

        Ok(queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(MAX_QUERIES)
            .collect())
    }
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w+\b").expect("valid regex"))
}

/// Keyword-window fallback: strip stop words, keep tokens longer than two
/// chars, then emit queries from different-length keyword windows to
/// maximize diversity.
pub fn generate_queries_fallback(claim: &str) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    let keywords: Vec<String> = word_re()
        .find_iter(&claim.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| !stop_words.contains(w.as_str()) && w.len() > 2)
        .take(MAX_KEYWORDS)
        .collect();

    let join = |range: &[String]| range.join(" ");

    let mut queries = Vec::new();
    if keywords.len() >= 3 {
        queries.push(join(&keywords[..keywords.len().min(4)]));
        queries.push(join(&keywords[..keywords.len().min(6)]));
        queries.push(join(&keywords[..keywords.len().min(7)]));
        if keywords.len() > 4 {
            queries.push(join(&keywords[2..keywords.len().min(6)]));
        }
        queries.push(join(&keywords[..3]));
    } else if !keywords.is_empty() {
        queries.push(join(&keywords));
    }

    // Dedup windows that collapsed to the same string for short claims.
    let mut seen = HashSet::new();
    queries.retain(|q| seen.insert(q.clone()));
    queries.truncate(MAX_QUERIES);

    if queries.is_empty() {
        vec![claim.chars().take(50).collect()]
    } else {
        queries
    }
}

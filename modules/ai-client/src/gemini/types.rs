use serde::{Deserialize, Serialize};

// --- Request ---

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GenerateRequest {
    /// The system prompt rides as the first part of the single user turn.
    pub fn new(system: &str, user: &str, temperature: f32, json: bool) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part {
                        text: system.to_string(),
                    },
                    Part {
                        text: user.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
                response_mime_type: json.then(|| "application/json".to_string()),
            },
        }
    }
}

// --- Response ---

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: String,
}

impl GenerateResponse {
    /// First candidate's first text part, if any.
    pub fn text(&self) -> Option<&str> {
        let part = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?;
        if part.text.is_empty() {
            None
        } else {
            Some(&part.text)
        }
    }
}

mod client;
pub(crate) mod types;

use async_trait::async_trait;

use client::GeminiClient;
use types::GenerateRequest;

use crate::error::ModelError;
use crate::traits::LanguageModel;
use crate::util::{recover_json, truncate_to_char_boundary};

/// Google Gemini provider.
#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ModelError> {
        let api_key = std::env::var("GOOGLE_API_KEY").map_err(|_| ModelError::MissingApiKey)?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    async fn generate_text(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        json: bool,
    ) -> Result<String, ModelError> {
        let request = GenerateRequest::new(system, user, temperature, json);
        let response = self.client().generate(&self.model, &request).await?;
        response
            .text()
            .map(|t| t.to_string())
            .ok_or(ModelError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for Gemini {
    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, ModelError> {
        self.generate_text(system, user, temperature, false).await
    }

    async fn generate_json(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<serde_json::Value, ModelError> {
        let text = self.generate_text(system, user, temperature, true).await?;
        recover_json(&text)
            .ok_or_else(|| ModelError::MalformedJson(truncate_to_char_boundary(&text, 200).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_new() {
        let ai = Gemini::new("test-key", "gemini-2.0-flash");
        assert_eq!(ai.model(), "gemini-2.0-flash");
        assert_eq!(ai.api_key, "test-key");
    }

    #[test]
    fn test_gemini_with_base_url() {
        let ai = Gemini::new("test-key", "gemini-2.0-flash")
            .with_base_url("https://custom.api.com/models");
        assert_eq!(
            ai.base_url,
            Some("https://custom.api.com/models".to_string())
        );
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "hello"}]}}
            ]
        }"#;
        let response: types::GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("hello"));
    }

    #[test]
    fn test_response_text_empty_candidates() {
        let response: types::GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(response.text(), None);
    }
}

use async_trait::async_trait;

use crate::error::ModelError;

/// Capability boundary for text generation.
///
/// `generate_json` asks the provider for a structured response and attempts
/// JSON-in-text recovery (code fences, JSON embedded in prose) before giving
/// up with `ModelError::MalformedJson`. Implementations must never panic on
/// malformed provider output.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-text generation.
    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, ModelError>;

    /// Structured generation. The returned value is whatever JSON the model
    /// produced; callers decode it into their own typed structs.
    async fn generate_json(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<serde_json::Value, ModelError>;
}

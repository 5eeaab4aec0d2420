use thiserror::Error;

/// Errors from the language-model capability. Callers are expected to map
/// these to component-specific fallback values rather than propagate them.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model API key not configured")]
    MissingApiKey,

    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("model returned no candidates")]
    EmptyResponse,

    #[error("model response is not valid JSON: {0}")]
    MalformedJson(String),
}

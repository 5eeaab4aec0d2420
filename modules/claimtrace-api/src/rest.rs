use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::AppState;

// --- Request structs ---

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    text: String,
    /// Optional URL source of the text; recorded for context only.
    #[allow(dead_code)]
    url: Option<String>,
}

#[derive(Deserialize)]
pub struct AnalyzeUrlRequest {
    url: String,
}

// --- Handlers ---

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "claimtrace API"
    }))
}

/// Analyze text and fact-check its claims. Degraded upstreams produce a
/// well-formed result with explanatory summary, so this never 500s on
/// capability failures.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let cancel = CancellationToken::new();
    let result = state.analyzer.analyze_text(&request.text, &cancel).await;
    (StatusCode::OK, Json(result))
}

/// Fetch a URL (HTML or PDF) and run the same pipeline on its content.
pub async fn analyze_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeUrlRequest>,
) -> impl IntoResponse {
    let cancel = CancellationToken::new();
    let result = state.analyzer.analyze_url(&request.url, &cancel).await;
    (StatusCode::OK, Json(result))
}

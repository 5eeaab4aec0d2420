use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use claimtrace_common::Config;
use claimtrace_pipeline::analyzer::Analyzer;

mod rest;

pub struct AppState {
    pub analyzer: Analyzer,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("claimtrace=info".parse()?))
        .init();

    let config = Config::from_env();
    let analyzer = Analyzer::from_config(&config);

    let state = Arc::new(AppState { analyzer });

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/v1/health", get(rest::health))
        .route("/api/v1/analyze", post(rest::analyze))
        .route("/api/v1/analyze/url", post(rest::analyze_url))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!(addr = addr.as_str(), "claimtrace API listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

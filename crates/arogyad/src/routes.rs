//! API routes for arogyad

use crate::server::AppState;
use arogya_common::selector::RankedCandidate;
use arogya_common::Resolution;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

type AppStateArc = Arc<AppState>;

// ============================================================================
// Ask Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub question: String,
    #[serde(default = "default_top")]
    pub top: usize,
}

fn default_top() -> usize {
    5
}

/// Upper bound for `top` in explain requests
const MAX_TOP: usize = 50;

pub fn ask_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/ask", post(ask))
        .route("/v1/explain", post(explain))
}

async fn ask(State(state): State<AppStateArc>, Json(req): Json<AskRequest>) -> Json<Resolution> {
    info!("[Q]  {}", req.question);
    Json(state.resolver.resolve_detailed(&req.question).await)
}

async fn explain(
    State(state): State<AppStateArc>,
    Json(req): Json<ExplainRequest>,
) -> Result<Json<Vec<RankedCandidate>>, (StatusCode, String)> {
    if req.top == 0 || req.top > MAX_TOP {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("top must be between 1 and {}", MAX_TOP),
        ));
    }
    Ok(Json(state.resolver.explain(&req.question, req.top)))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub intents: usize,
    pub patterns: usize,
    pub records: usize,
    pub encoder: String,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let catalog = state.resolver.catalog();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        intents: catalog.len(),
        patterns: catalog.pattern_count(),
        records: state.resolver.records().len(),
        encoder: state.resolver.encoder_name().to_string(),
    })
}

// ============================================================================
// Intent Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct IntentInfo {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListIntentsResponse {
    pub intents: Vec<IntentInfo>,
}

pub fn intent_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/intents", get(list_intents))
}

async fn list_intents(State(state): State<AppStateArc>) -> Json<ListIntentsResponse> {
    let intents = state
        .resolver
        .catalog()
        .intents()
        .iter()
        .map(|intent| IntentInfo {
            tag: intent.tag.clone(),
            patterns: intent.patterns.clone(),
            responses: intent.responses.len(),
        })
        .collect();

    Json(ListIntentsResponse { intents })
}

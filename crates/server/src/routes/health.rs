use crate::state::ServerState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "triage-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// 200 once the embedding model and specialty vectors are loaded, 503 while
/// unloaded, loading or failed. The body carries the lifecycle state either way.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let lifecycle = state.predictor.lifecycle();
    let model_state = lifecycle.state();
    let ready = model_state.is_ready();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if ready { "ready" } else { "not_ready" },
        "service": "triage-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "model": model_state,
        "specialties": lifecycle.catalog().len(),
    }));

    (status, body)
}

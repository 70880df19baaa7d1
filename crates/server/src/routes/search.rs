use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Free-text description of the patient's problem
    #[serde(default)]
    pub problem: Option<String>,
}

/// Search response
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub specialization: String,
    /// Cosine score of the chosen specialty; absent when the fallback was used
    pub score: Option<f32>,
    pub fallback: bool,
}

/// Map a problem description to the best-fitting specialty.
///
/// A missing or blank `problem` is rejected with 400 before the model is
/// touched. Prediction failures (model unavailable, embedding error, timeout)
/// fail the request with 500.
///
/// # Example
///
/// ```json
/// POST /api/ai/search
/// { "problem": "itchy red rash on both arms" }
///
/// 200 OK
/// { "specialization": "Dermatologist", "score": 0.61, "fallback": false }
/// ```
pub async fn ai_search(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ServerResult<Json<SearchResponse>> {
    let Json(request) = payload.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;

    let problem = request
        .problem
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("Problem description required".to_string()))?;

    let prediction = state.predictor.predict_detailed(&problem).await?;

    tracing::debug!(
        specialization = %prediction.specialty,
        fallback = prediction.fallback,
        "search answered"
    );

    Ok(Json(SearchResponse {
        specialization: prediction.specialty,
        score: prediction.score,
        fallback: prediction.fallback,
    }))
}

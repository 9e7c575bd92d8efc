//! Triage decision endpoint.

use axum::Json;
use axum::extract::State;
use solace_core::emotion::classify;
use solace_core::triage::decide;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{DecisionResponse, TextRequest};

/// `POST /api/agent/decide`: classify, then pick the next action.
pub async fn decide_handler(
    State(state): State<AppState>,
    Json(body): Json<TextRequest>,
) -> AppResult<Json<DecisionResponse>> {
    let emotion = classify(state.llm.as_ref(), &body.text).await?;
    Ok(Json(decide(emotion)))
}

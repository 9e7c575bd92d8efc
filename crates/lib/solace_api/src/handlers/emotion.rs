//! Emotion classification endpoint.

use axum::Json;
use axum::extract::State;
use solace_core::emotion::classify;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{EmotionResponse, TextRequest};

/// `POST /api/emotion`: classify one message.
pub async fn emotion_handler(
    State(state): State<AppState>,
    Json(body): Json<TextRequest>,
) -> AppResult<Json<EmotionResponse>> {
    let result = classify(state.llm.as_ref(), &body.text).await?;
    Ok(Json(result))
}

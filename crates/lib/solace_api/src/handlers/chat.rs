//! Companion chat endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use solace_core::companion::respond;
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{ChatRequest, ChatResponse};

/// `POST /api/chat`: triage the latest user message and reply.
pub async fn chat_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    if body.messages.is_empty() {
        return Err(AppError::Validation("messages must not be empty".into()));
    }
    let outcome = respond(state.llm.as_ref(), &body.messages).await?;
    debug!(
        user_id = %user.user_id,
        next_action = %outcome.decision.next_action,
        "chat turn handled"
    );
    Ok(Json(ChatResponse {
        reply: outcome.reply,
        decision: outcome.decision,
    }))
}

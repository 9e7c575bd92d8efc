//! Mood journal handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use solace_core::mood::{self, MoodEntry, MoodInput, Page};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{MoodEntryRequest, PageQuery};

impl From<MoodEntryRequest> for MoodInput {
    fn from(r: MoodEntryRequest) -> Self {
        MoodInput {
            mood_score: r.mood_score,
            note: r.note,
            tags: r.tags,
        }
    }
}

/// `POST /api/mood`
pub async fn create_entry_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<MoodEntryRequest>,
) -> AppResult<(StatusCode, Json<MoodEntry>)> {
    let entry = mood::create_entry(&state.pool, user.user_id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /api/mood?skip=&limit=`: newest first, limit capped at 500.
pub async fn list_entries_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Vec<MoodEntry>>> {
    let entries = mood::list_entries(&state.pool, user.user_id, Page::new(q.skip, q.limit)).await?;
    Ok(Json(entries))
}

/// `GET /api/mood/{id}`
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MoodEntry>> {
    Ok(Json(mood::get_entry(&state.pool, user.user_id, id).await?))
}

/// `PUT /api/mood/{id}`
pub async fn update_entry_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<MoodEntryRequest>,
) -> AppResult<Json<MoodEntry>> {
    let entry = mood::update_entry(&state.pool, user.user_id, id, body.into()).await?;
    Ok(Json(entry))
}

/// `DELETE /api/mood/{id}`
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    mood::delete_entry(&state.pool, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Emergency contact handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use solace_core::contacts::{self, EmergencyContact, NewContact};
use tracing::info;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::ContactRequest;

/// `POST /api/emergency-contacts`
pub async fn create_contact_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ContactRequest>,
) -> AppResult<(StatusCode, Json<EmergencyContact>)> {
    let contact = contacts::create_contact(
        &state.pool,
        user.user_id,
        NewContact {
            name: body.name,
            phone_number: body.phone_number,
            relationship_type: body.relationship_type,
        },
    )
    .await?;
    info!(user_id = %user.user_id, contact_id = %contact.id, "emergency contact added");
    Ok((StatusCode::CREATED, Json(contact)))
}

/// `GET /api/emergency-contacts`
pub async fn list_contacts_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<Json<Vec<EmergencyContact>>> {
    Ok(Json(contacts::list_contacts(&state.pool, user.user_id).await?))
}

/// `DELETE /api/emergency-contacts/{id}`
pub async fn delete_contact_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    contacts::delete_contact(&state.pool, user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

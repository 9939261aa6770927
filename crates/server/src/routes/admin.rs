//! Writes to the family. Every route requires a live admin session.

use axum::{
    Router,
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::{Json as ResponseJson, Response},
    routing::{post, put},
};
use db::models::person::{Person, PersonDraft};
use services::services::auth::AuthError;
use utils::response::ApiResponse;
use uuid::Uuid;

use super::auth::bearer_token;
use crate::{AppState, error::ApiError};

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::InvalidSession)?;
    state.gate().validate(token)?;
    Ok(next.run(request).await)
}

/// POST /api/admin/people
pub async fn create_person(
    State(state): State<AppState>,
    axum::Json(payload): axum::Json<PersonDraft>,
) -> Result<ResponseJson<ApiResponse<Person>>, ApiError> {
    let person = state.family().add_person(payload).await?;
    Ok(ResponseJson(ApiResponse::success(person)))
}

/// PUT /api/admin/people/{id}
pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(payload): axum::Json<PersonDraft>,
) -> Result<ResponseJson<ApiResponse<Person>>, ApiError> {
    let person = state.family().update_person(id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(person)))
}

/// DELETE /api/admin/people/{id}
/// Removes the person and every descendant, returning the removed ids
pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Uuid>>>, ApiError> {
    let deleted = state.family().delete_person(id).await?;
    Ok(ResponseJson(ApiResponse::success(deleted)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/people", post(create_person))
        .route("/people/{id}", put(update_person).delete(delete_person))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

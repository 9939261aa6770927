use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::person::Person;
use forest::TreeNode;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// GET /api/people/{id}
/// The person together with all of their descendants
pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<TreeNode<Person>>>, ApiError> {
    let node = state.family().person(id).await?;
    Ok(ResponseJson(ApiResponse::success(node)))
}

/// GET /api/people/{id}/parent
/// `data` is null for people at the root level
pub async fn get_parent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Option<Person>>>, ApiError> {
    let parent = state.family().parent_of(id).await?;
    Ok(ResponseJson(ApiResponse::success(parent)))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/people/{id}", get(get_person))
        .route("/people/{id}/parent", get(get_parent))
}

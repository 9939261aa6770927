use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::AppState;

#[derive(Debug, Serialize, TS)]
pub struct Health {
    pub status: String,
    pub backend: String,
    pub admin_enabled: bool,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> ResponseJson<ApiResponse<Health>> {
    ResponseJson(ApiResponse::success(Health {
        status: "ok".to_string(),
        backend: state.family().backend().to_string(),
        admin_enabled: state.gate().is_enabled(),
    }))
}

pub fn router(_state: &AppState) -> Router<AppState> {
    Router::new().route("/health", get(health))
}

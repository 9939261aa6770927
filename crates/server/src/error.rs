use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{auth::AuthError, family::FamilyServiceError};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Family(#[from] FamilyServiceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Family(err) => match err {
                FamilyServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                FamilyServiceError::PersonNotFound(_) => StatusCode::NOT_FOUND,
                FamilyServiceError::Validation(_)
                | FamilyServiceError::ParentNotFound(_)
                | FamilyServiceError::WouldCreateCycle { .. } => StatusCode::BAD_REQUEST,
            },
            ApiError::Auth(AuthError::Disabled) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "The family tree store is unavailable".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}

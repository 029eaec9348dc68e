use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::{auth_service::AuthError, progress_service::ProgressError};

/// Error returned by handlers; rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials | AuthError::Validation(_) | AuthError::EmailTaken => {
                ApiError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            AuthError::InvalidCredentials => ApiError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::Internal(e) => {
                tracing::error!("Auth request failed: {:#}", e);
                ApiError::internal()
            }
        }
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::MissingFields => ApiError::new(StatusCode::BAD_REQUEST, err.to_string()),
            ProgressError::Storage(e) => {
                tracing::error!("Progress request failed: {}", e);
                ApiError::internal()
            }
        }
    }
}

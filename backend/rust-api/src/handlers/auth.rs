use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::user::{LoginRequest, RegisterRequest},
    services::{auth_service::AuthService, AppState},
};

/// POST /api/register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Registering new user: {:?}", req.email);

    let service = AuthService::new(state.store.clone(), state.config.server.bcrypt_cost);
    let response = service.register(req).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Login attempt for user: {:?}", req.email);

    let service = AuthService::new(state.store.clone(), state.config.server.bcrypt_cost);
    let user = service.login(req).await?;

    Ok((StatusCode::OK, Json(user)))
}

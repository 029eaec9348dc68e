use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    error::ApiError,
    extractors::AppJson,
    models::progress::ProgressRequest,
    services::{progress_service::ProgressService, AppState},
};

/// POST /api/progress - Upsert quest progress for a player
pub async fn save_progress(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<ProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.store.clone());
    let response = service.save_progress(req).await?;
    Ok(Json(response))
}

/// GET /api/progress/{email} - All stored progress of a player
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Listing progress for {}", email);

    let service = ProgressService::new(state.store.clone());
    let entries = service.list_progress(&email).await?;
    Ok(Json(entries))
}

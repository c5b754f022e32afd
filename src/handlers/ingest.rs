use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

use super::AppState;
use crate::auth::TriggerCredential;
use crate::error::AppError;

/// Handle POST /api/ingest
///
/// Launches a pass in the background and answers 202 without waiting for it.
pub async fn trigger_ingestion(
    State(state): State<AppState>,
    Extension(credential): Extension<TriggerCredential>,
) -> Result<impl IntoResponse, AppError> {
    let accepted = state.service.trigger_ingestion(Some(&credential.0))?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Handle GET /api/ingest/status
pub async fn ingestion_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.ingestion_status())
}

use axum::{extract::State, response::IntoResponse, Json};

use super::AppState;

/// Handle /health endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.health())
}

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::AppError;
use crate::query::DateSelection;

/// Optional date filters on marine data reads
#[derive(Debug, Default, Deserialize)]
pub struct MarineDataParams {
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Handle GET /api/marine-data/:country/:city
pub async fn marine_data(
    State(state): State<AppState>,
    Path((country, city)): Path<(String, String)>,
    Query(params): Query<MarineDataParams>,
) -> Result<impl IntoResponse, AppError> {
    let selection = DateSelection::from_params(
        params.date.as_deref(),
        params.start.as_deref(),
        params.end.as_deref(),
        Local::now().date_naive(),
    )?;

    let data = state.service.marine_data(&country, &city, selection).await?;
    Ok(Json(data))
}

/// Handle GET /api/marine-data/:country/:city/latest
pub async fn latest_marine_data(
    State(state): State<AppState>,
    Path((country, city)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let observation = state.service.latest_marine_data(&country, &city).await?;
    Ok(Json(observation))
}

/// Handle GET /api/countries
pub async fn countries(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let countries = state.service.countries().await?;
    Ok(Json(json!({ "countries": countries })))
}

/// Handle GET /api/cities/:country
pub async fn cities(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cities = state.service.cities(&country).await?;
    Ok(Json(json!({ "country": country, "cities": cities })))
}

/// Handle GET /api/stats
pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.service.stats().await?))
}

/// Handle GET /api/sources
pub async fn sources(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sources = state.service.sources().await?;
    Ok(Json(json!({ "sources": sources })))
}

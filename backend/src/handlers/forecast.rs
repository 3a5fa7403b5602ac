//! HTTP handlers for forecast and model endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use shared::models::{ForecastResult, ModelSummary};

use crate::error::AppResult;
use crate::services::{ForecastService, TrainerStatus};
use crate::AppState;

/// Horizon used when a forecast request omits one
const DEFAULT_HORIZON_MONTHS: u32 = 6;

/// Series length used when a series request omits one
const DEFAULT_SERIES_HORIZON_MONTHS: u32 = 12;

pub(crate) fn forecast_service(state: &AppState) -> ForecastService {
    ForecastService::new(
        state.db.clone(),
        state.config.clone(),
        state.model.clone(),
        state.cache.clone(),
    )
}

/// Query parameters for a single forecast
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub horizon_months: Option<u32>,
}

/// Get a yield forecast for a farm
pub async fn get_forecast(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> AppResult<Json<ForecastResult>> {
    let horizon = query.horizon_months.unwrap_or(DEFAULT_HORIZON_MONTHS);
    let forecast = forecast_service(&state).forecast(&farm_id, horizon).await?;
    Ok(Json(forecast))
}

/// Query parameters for a forecast series
#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub max_horizon: Option<u32>,
}

/// Get forecasts at every horizon up to `max_horizon`, for charts
pub async fn get_forecast_series(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<Vec<ForecastResult>>> {
    let max_horizon = query.max_horizon.unwrap_or(DEFAULT_SERIES_HORIZON_MONTHS);
    let series = forecast_service(&state)
        .forecast_series(&farm_id, max_horizon)
        .await?;
    Ok(Json(series))
}

#[derive(Serialize)]
pub struct RetrainResponse {
    pub message: String,
}

/// Ask the trainer for an out-of-band retrain
pub async fn request_retrain(State(state): State<AppState>) -> (StatusCode, Json<RetrainResponse>) {
    state.model.request_retrain();
    (
        StatusCode::ACCEPTED,
        Json(RetrainResponse {
            message: "Retrain requested".to_string(),
        }),
    )
}

#[derive(Serialize)]
pub struct ModelStatusResponse {
    pub model: Option<ModelSummary>,
    pub trainer: TrainerStatus,
}

/// Get the installed model's summary and the trainer's state
pub async fn get_model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    let model = state.model.summary().await;
    let trainer = state.trainer.read().await.clone();
    Json(ModelStatusResponse { model, trainer })
}

//! HTTP handlers for weather context endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use shared::{
    models::{CurrentConditions, WeatherObservation},
    types::DateRange,
};

use crate::error::AppResult;
use crate::services::weather::{StoreObservationInput, WeatherContextService};
use crate::AppState;

fn weather_service(state: &AppState) -> WeatherContextService {
    WeatherContextService::from_config(state.db.clone(), &state.config.weather)
}

/// Store a daily weather observation for a farm
pub async fn store_observation(
    State(state): State<AppState>,
    Json(input): Json<StoreObservationInput>,
) -> AppResult<Json<WeatherObservation>> {
    let observation = weather_service(&state).store_observation(input).await?;
    Ok(Json(observation))
}

/// Query parameters for a stored weather window
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Get a farm's stored observations inside a date range
pub async fn get_weather_window(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<Vec<WeatherObservation>>> {
    let range = DateRange::new(query.start_date, query.end_date);
    let window = weather_service(&state).window(&farm_id, range).await?;
    Ok(Json(window))
}

/// Fetch live conditions from the external API and record them as today's
/// observation for the farm
pub async fn fetch_current_weather(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> AppResult<Json<CurrentConditions>> {
    let conditions = weather_service(&state).current(&farm_id).await?;
    Ok(Json(conditions))
}

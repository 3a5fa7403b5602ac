//! Route definitions for the Ibali Farm Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Harvest record ingestion and history
        .nest("/records", record_routes())
        // Yield forecasts
        .nest("/forecasts", forecast_routes())
        // Model lifecycle
        .nest("/model", model_routes())
        // Weather context
        .nest("/weather", weather_routes())
        // Reporting and export
        .nest("/reports", report_routes())
}

/// Harvest record routes
fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::append_record))
        .route("/farms", get(handlers::list_farms))
        .route("/:farm_id", get(handlers::get_farm_records))
}

/// Forecast routes
fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/:farm_id", get(handlers::get_forecast))
        .route("/:farm_id/series", get(handlers::get_forecast_series))
}

/// Model lifecycle routes
fn model_routes() -> Router<AppState> {
    Router::new()
        .route("/retrain", post(handlers::request_retrain))
        .route("/status", get(handlers::get_model_status))
}

/// Weather context routes
fn weather_routes() -> Router<AppState> {
    Router::new()
        .route("/observations", post(handlers::store_observation))
        .route("/:farm_id/window", get(handlers::get_weather_window))
        .route("/:farm_id/current", get(handlers::fetch_current_weather))
}

/// Reporting routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/trends", get(handlers::get_trends))
        .route("/forecast/:farm_id", get(handlers::get_forecast_report))
        .route("/forecast/:farm_id/csv", get(handlers::export_forecast_csv))
}

//! Reporting handlers for analytics and data export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::forecast::forecast_service;
use crate::services::reporting::{
    DashboardMetrics, ForecastReport, MonthlyTrendPoint, ReportingService,
};
use crate::AppState;

/// Trend window used when the query omits one
const DEFAULT_TREND_MONTHS: u32 = 24;

/// Series length used when a report request omits one
const DEFAULT_REPORT_HORIZON_MONTHS: u32 = 6;

/// Get dashboard metrics
pub async fn get_dashboard(State(state): State<AppState>) -> AppResult<Json<DashboardMetrics>> {
    let service = ReportingService::new(state.db.clone());
    let model = state.model.summary().await;
    let metrics = service.get_dashboard_metrics(model).await?;
    Ok(Json(metrics))
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub months: Option<u32>,
}

/// Get monthly yield trends across all farms
pub async fn get_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> AppResult<Json<Vec<MonthlyTrendPoint>>> {
    let service = ReportingService::new(state.db.clone());
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);
    let trends = service.get_monthly_trends(months).await?;
    Ok(Json(trends))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub max_horizon: Option<u32>,
}

/// Get the renderer-ready forecast report for a farm
pub async fn get_forecast_report(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ForecastReport>> {
    let max_horizon = query.max_horizon.unwrap_or(DEFAULT_REPORT_HORIZON_MONTHS);
    let series = forecast_service(&state)
        .forecast_series(&farm_id, max_horizon)
        .await?;

    let service = ReportingService::new(state.db.clone());
    let report = service.get_forecast_report(&farm_id, series).await?;
    Ok(Json(report))
}

/// Export a farm's forecast series as CSV
pub async fn export_forecast_csv(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let max_horizon = query.max_horizon.unwrap_or(DEFAULT_REPORT_HORIZON_MONTHS);
    let series = forecast_service(&state)
        .forecast_series(&farm_id, max_horizon)
        .await?;

    let csv = ReportingService::export_to_csv(&series)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"forecast_series.csv\"",
            ),
        ],
        csv,
    ))
}

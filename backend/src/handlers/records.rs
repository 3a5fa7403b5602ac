//! HTTP handlers for harvest record endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use shared::{models::HarvestRecord, types::DateRange};

use crate::error::{AppError, AppResult};
use crate::services::records::{AppendRecordInput, FarmSummary, RecordService};
use crate::AppState;

/// Ingest a harvest record
pub async fn append_record(
    State(state): State<AppState>,
    Json(input): Json<AppendRecordInput>,
) -> AppResult<Json<HarvestRecord>> {
    let service = RecordService::new(state.db.clone());
    let record = service.append(input).await?;

    // New history changes what any horizon would predict for this farm
    state.cache.invalidate_farm(&record.farm_id).await;

    Ok(Json(record))
}

/// Query parameters for a farm's harvest history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Get a farm's harvest history, oldest first
pub async fn get_farm_records(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<HarvestRecord>>> {
    let range = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation {
                field: "date_range".to_string(),
                message: "start_date and end_date must be provided together".to_string(),
            });
        }
    };

    let service = RecordService::new(state.db.clone());
    let records = service.query(&farm_id, range).await?;
    Ok(Json(records))
}

/// Get known farm codes with record counts
pub async fn list_farms(State(state): State<AppState>) -> AppResult<Json<Vec<FarmSummary>>> {
    let service = RecordService::new(state.db.clone());
    let farms = service.farms().await?;
    Ok(Json(farms))
}

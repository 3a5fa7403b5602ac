//! Harvest record store
//!
//! Append-only: records are inserted and read, never updated or deleted.
//! A correction is a new record; a duplicate submission is rejected. The
//! query surface is farm plus optional date range, ordered by harvest date.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    models::{CropType, HarvestRecord},
    types::DateRange,
    validation::{
        validate_area_hectares, validate_crop_dates, validate_farm_code, validate_rainfall_mm,
        validate_temperature_avg_c, validate_yield_quantity,
    },
};

use crate::error::{AppError, AppResult};

/// Record store service backed by PostgreSQL
#[derive(Clone)]
pub struct RecordService {
    db: PgPool,
}

/// Database row for a harvest record
#[derive(Debug, Clone, sqlx::FromRow)]
struct HarvestRecordRow {
    id: Uuid,
    farm_id: String,
    crop_type: String,
    planting_date: NaiveDate,
    harvest_date: NaiveDate,
    yield_quantity: Decimal,
    area_hectares: Decimal,
    rainfall_mm: Decimal,
    temperature_avg_c: Decimal,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<HarvestRecordRow> for HarvestRecord {
    type Error = AppError;

    fn try_from(row: HarvestRecordRow) -> Result<Self, Self::Error> {
        let crop_type = CropType::from_str(&row.crop_type)
            .map_err(|e| AppError::Internal(format!("corrupt crop_type in store: {}", e)))?;

        Ok(HarvestRecord {
            id: row.id,
            farm_id: row.farm_id,
            crop_type,
            planting_date: row.planting_date,
            harvest_date: row.harvest_date,
            yield_quantity: row.yield_quantity,
            area_hectares: row.area_hectares,
            rainfall_mm: row.rainfall_mm,
            temperature_avg_c: row.temperature_avg_c,
            recorded_at: row.recorded_at,
        })
    }
}

/// Input for appending a harvest record
#[derive(Debug, Deserialize)]
pub struct AppendRecordInput {
    pub farm_id: String,
    pub crop_type: CropType,
    pub planting_date: NaiveDate,
    pub harvest_date: NaiveDate,
    pub yield_quantity: Decimal,
    pub area_hectares: Decimal,
    pub rainfall_mm: Decimal,
    pub temperature_avg_c: Decimal,
}

/// Per-farm activity summary
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FarmSummary {
    pub farm_id: String,
    pub record_count: i64,
    pub latest_harvest: Option<NaiveDate>,
}

impl RecordService {
    /// Create a new RecordService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append a harvest record to the store
    pub async fn append(&self, input: AppendRecordInput) -> AppResult<HarvestRecord> {
        Self::validate_input(&input)?;

        let record = HarvestRecord {
            id: Uuid::new_v4(),
            farm_id: input.farm_id,
            crop_type: input.crop_type,
            planting_date: input.planting_date,
            harvest_date: input.harvest_date,
            yield_quantity: input.yield_quantity,
            area_hectares: input.area_hectares,
            rainfall_mm: input.rainfall_mm,
            temperature_avg_c: input.temperature_avg_c,
            recorded_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO harvest_records
                (id, farm_id, crop_type, planting_date, harvest_date,
                 yield_quantity, area_hectares, rainfall_mm, temperature_avg_c, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(record.id)
        .bind(&record.farm_id)
        .bind(record.crop_type.as_str())
        .bind(record.planting_date)
        .bind(record.harvest_date)
        .bind(record.yield_quantity)
        .bind(record.area_hectares)
        .bind(record.rainfall_mm)
        .bind(record.temperature_avg_c)
        .bind(record.recorded_at)
        .execute(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::ValidationError(
                    "A record for this farm, harvest date, and crop type already exists"
                        .to_string(),
                )
            }
            _ => AppError::DatabaseError(e),
        })?;

        Ok(record)
    }

    /// All records for a farm, oldest harvest first
    pub async fn query(
        &self,
        farm_id: &str,
        range: Option<DateRange>,
    ) -> AppResult<Vec<HarvestRecord>> {
        if let Some(range) = &range {
            if !range.is_valid() {
                return Err(AppError::Validation {
                    field: "date_range".to_string(),
                    message: "Start date must not be after end date".to_string(),
                });
            }
        }

        let rows = match range {
            Some(range) => {
                sqlx::query_as::<_, HarvestRecordRow>(
                    r#"
                    SELECT id, farm_id, crop_type, planting_date, harvest_date,
                           yield_quantity, area_hectares, rainfall_mm, temperature_avg_c, recorded_at
                    FROM harvest_records
                    WHERE farm_id = $1 AND harvest_date BETWEEN $2 AND $3
                    ORDER BY harvest_date ASC, recorded_at ASC
                    "#,
                )
                .bind(farm_id)
                .bind(range.start)
                .bind(range.end)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, HarvestRecordRow>(
                    r#"
                    SELECT id, farm_id, crop_type, planting_date, harvest_date,
                           yield_quantity, area_hectares, rainfall_mm, temperature_avg_c, recorded_at
                    FROM harvest_records
                    WHERE farm_id = $1
                    ORDER BY harvest_date ASC, recorded_at ASC
                    "#,
                )
                .bind(farm_id)
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(HarvestRecord::try_from).collect()
    }

    /// All records across farms with a harvest date on or after the cutoff,
    /// oldest first. This is the trainer's view of the store.
    pub async fn all_since(&self, cutoff: NaiveDate) -> AppResult<Vec<HarvestRecord>> {
        let rows = sqlx::query_as::<_, HarvestRecordRow>(
            r#"
            SELECT id, farm_id, crop_type, planting_date, harvest_date,
                   yield_quantity, area_hectares, rainfall_mm, temperature_avg_c, recorded_at
            FROM harvest_records
            WHERE harvest_date >= $1
            ORDER BY harvest_date ASC, recorded_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(HarvestRecord::try_from).collect()
    }

    /// Total record count across all farms
    pub async fn count(&self) -> AppResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM harvest_records")
                .fetch_one(&self.db)
                .await?;
        Ok(count)
    }

    /// Known farms with their record counts and latest harvest dates
    pub async fn farms(&self) -> AppResult<Vec<FarmSummary>> {
        let farms = sqlx::query_as::<_, FarmSummary>(
            r#"
            SELECT farm_id, COUNT(*) as record_count, MAX(harvest_date) as latest_harvest
            FROM harvest_records
            GROUP BY farm_id
            ORDER BY farm_id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(farms)
    }

    /// Validate an append input field by field
    fn validate_input(input: &AppendRecordInput) -> AppResult<()> {
        validate_farm_code(&input.farm_id).map_err(|msg| AppError::Validation {
            field: "farm_id".to_string(),
            message: msg.to_string(),
        })?;
        validate_crop_dates(input.planting_date, input.harvest_date).map_err(|msg| {
            AppError::Validation {
                field: "harvest_date".to_string(),
                message: msg.to_string(),
            }
        })?;
        validate_yield_quantity(input.yield_quantity).map_err(|msg| AppError::Validation {
            field: "yield_quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_area_hectares(input.area_hectares).map_err(|msg| AppError::Validation {
            field: "area_hectares".to_string(),
            message: msg.to_string(),
        })?;
        validate_rainfall_mm(input.rainfall_mm).map_err(|msg| AppError::Validation {
            field: "rainfall_mm".to_string(),
            message: msg.to_string(),
        })?;
        validate_temperature_avg_c(input.temperature_avg_c).map_err(|msg| {
            AppError::Validation {
                field: "temperature_avg_c".to_string(),
                message: msg.to_string(),
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AppendRecordInput {
        AppendRecordInput {
            farm_id: "KGL-01".to_string(),
            crop_type: CropType::Maize,
            planting_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            harvest_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            yield_quantity: Decimal::from(32),
            area_hectares: Decimal::from(10),
            rainfall_mm: Decimal::from(505),
            temperature_avg_c: Decimal::from(21),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(RecordService::validate_input(&input()).is_ok());
    }

    #[test]
    fn test_zero_yield_is_accepted() {
        let mut bad_season = input();
        bad_season.yield_quantity = Decimal::ZERO;
        assert!(RecordService::validate_input(&bad_season).is_ok());
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let mut reversed = input();
        reversed.harvest_date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let err = RecordService::validate_input(&reversed).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "harvest_date"));
    }

    #[test]
    fn test_zero_area_rejected() {
        let mut zero_area = input();
        zero_area.area_hectares = Decimal::ZERO;
        let err = RecordService::validate_input(&zero_area).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "area_hectares"));
    }

    #[test]
    fn test_negative_rainfall_rejected() {
        let mut negative = input();
        negative.rainfall_mm = Decimal::from(-5);
        let err = RecordService::validate_input(&negative).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "rainfall_mm"));
    }

    #[test]
    fn test_lowercase_farm_code_rejected() {
        let mut lowercase = input();
        lowercase.farm_id = "kgl-01".to_string();
        let err = RecordService::validate_input(&lowercase).unwrap_err();
        assert!(matches!(err, AppError::Validation { field, .. } if field == "farm_id"));
    }

    #[test]
    fn test_corrupt_crop_type_surfaces_internal_error() {
        let row = HarvestRecordRow {
            id: Uuid::new_v4(),
            farm_id: "KGL-01".to_string(),
            crop_type: "dragonfruit".to_string(),
            planting_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            harvest_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            yield_quantity: Decimal::from(32),
            area_hectares: Decimal::from(10),
            rainfall_mm: Decimal::from(505),
            temperature_avg_c: Decimal::from(21),
            recorded_at: Utc::now(),
        };
        assert!(matches!(
            HarvestRecord::try_from(row),
            Err(AppError::Internal(_))
        ));
    }
}

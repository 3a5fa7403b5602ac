//! Weather context service
//!
//! Stores daily per-farm observations and serves the windows the feature
//! builder consumes. Current conditions come from the external API and are
//! recorded as that day's observation; when the API is unreachable the
//! failure is surfaced, never papered over with fabricated readings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{
    models::{CurrentConditions, WeatherObservation},
    types::{DateRange, GpsCoordinates},
    validation::{validate_farm_code, validate_rainfall_mm, validate_temperature_avg_c},
};

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};
use crate::external::WeatherClient;

/// Weather context provider backed by stored observations plus the
/// external API for current conditions
#[derive(Clone)]
pub struct WeatherContextService {
    db: PgPool,
    client: Option<WeatherClient>,
    default_location: GpsCoordinates,
}

/// Database row for a weather observation
#[derive(Debug, Clone, sqlx::FromRow)]
struct WeatherObservationRow {
    id: Uuid,
    farm_id: String,
    date: NaiveDate,
    rainfall_mm: Decimal,
    temperature_avg_c: Decimal,
    recorded_at: DateTime<Utc>,
}

impl From<WeatherObservationRow> for WeatherObservation {
    fn from(row: WeatherObservationRow) -> Self {
        Self {
            id: row.id,
            farm_id: row.farm_id,
            date: row.date,
            rainfall_mm: row.rainfall_mm,
            temperature_avg_c: row.temperature_avg_c,
            recorded_at: row.recorded_at,
        }
    }
}

/// Input for storing a weather observation
#[derive(Debug, Deserialize)]
pub struct StoreObservationInput {
    pub farm_id: String,
    pub date: NaiveDate,
    pub rainfall_mm: Decimal,
    pub temperature_avg_c: Decimal,
}

impl WeatherContextService {
    /// Create a service from the weather configuration. An empty API key
    /// disables the external client; stored observations keep working.
    pub fn from_config(db: PgPool, config: &WeatherConfig) -> Self {
        let client = if config.api_key.is_empty() {
            None
        } else {
            Some(WeatherClient::new(
                config.api_key.clone(),
                config.api_endpoint.clone(),
            ))
        };

        Self {
            db,
            client,
            default_location: GpsCoordinates::new(
                config.default_latitude,
                config.default_longitude,
            ),
        }
    }

    /// Store or refresh the observation for one farm and day
    pub async fn store_observation(
        &self,
        input: StoreObservationInput,
    ) -> AppResult<WeatherObservation> {
        Self::validate_input(&input)?;

        let row = sqlx::query_as::<_, WeatherObservationRow>(
            r#"
            INSERT INTO weather_observations (id, farm_id, date, rainfall_mm, temperature_avg_c, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (farm_id, date) DO UPDATE
                SET rainfall_mm = EXCLUDED.rainfall_mm,
                    temperature_avg_c = EXCLUDED.temperature_avg_c,
                    recorded_at = EXCLUDED.recorded_at
            RETURNING id, farm_id, date, rainfall_mm, temperature_avg_c, recorded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.farm_id)
        .bind(input.date)
        .bind(input.rainfall_mm)
        .bind(input.temperature_avg_c)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    /// Observations for a farm inside a date range, oldest first
    pub async fn window(
        &self,
        farm_id: &str,
        range: DateRange,
    ) -> AppResult<Vec<WeatherObservation>> {
        if !range.is_valid() {
            return Err(AppError::Validation {
                field: "date_range".to_string(),
                message: "Start date must not be after end date".to_string(),
            });
        }

        let rows = sqlx::query_as::<_, WeatherObservationRow>(
            r#"
            SELECT id, farm_id, date, rainfall_mm, temperature_avg_c, recorded_at
            FROM weather_observations
            WHERE farm_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date ASC
            "#,
        )
        .bind(farm_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(WeatherObservation::from).collect())
    }

    /// Observations across all farms on or after the cutoff, for training
    pub async fn all_since(&self, cutoff: NaiveDate) -> AppResult<Vec<WeatherObservation>> {
        let rows = sqlx::query_as::<_, WeatherObservationRow>(
            r#"
            SELECT id, farm_id, date, rainfall_mm, temperature_avg_c, recorded_at
            FROM weather_observations
            WHERE date >= $1
            ORDER BY farm_id ASC, date ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(WeatherObservation::from).collect())
    }

    /// Live conditions from the external API, recorded as today's
    /// observation for the farm
    pub async fn current(&self, farm_id: &str) -> AppResult<CurrentConditions> {
        validate_farm_code(farm_id).map_err(|msg| AppError::Validation {
            field: "farm_id".to_string(),
            message: msg.to_string(),
        })?;

        let client = self
            .client
            .as_ref()
            .ok_or(AppError::WeatherServiceUnavailable)?;

        let conditions = client.current(&self.default_location).await?;

        self.store_observation(StoreObservationInput {
            farm_id: farm_id.to_string(),
            date: conditions.observed_at.date_naive(),
            rainfall_mm: conditions.rainfall_mm,
            temperature_avg_c: conditions.temperature_celsius,
        })
        .await?;

        Ok(conditions)
    }

    fn validate_input(input: &StoreObservationInput) -> AppResult<()> {
        validate_farm_code(&input.farm_id).map_err(|msg| AppError::Validation {
            field: "farm_id".to_string(),
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

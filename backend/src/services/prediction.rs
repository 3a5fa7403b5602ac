//! Forecast service
//!
//! The request-time pipeline: harvest history to features to model to
//! calibrated interval. Results are cached under the model version that
//! produced them, so installing a new model strands every stale entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Months, NaiveDate, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;

use shared::{
    models::{ForecastResult, HarvestRecord, WeatherObservation},
    types::DateRange,
    validation::{validate_farm_code, validate_horizon_months},
};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ml::{FeatureBuilder, ModelSlot, TrainedModel};
use crate::services::{bounded, RecordService, WeatherContextService};

/// Days of stored weather leading up to today that feed the forecast vector
const RECENT_WEATHER_DAYS: i64 = 90;

// ============================================================================
// Forecast Cache
// ============================================================================

/// In-memory forecast cache keyed by farm, horizon, and model version.
///
/// A lookup only ever uses the live model's version, so entries from a
/// replaced model can never be served again; the trainer clears the map
/// after an install purely to reclaim the memory.
#[derive(Default)]
pub struct ForecastCache {
    entries: RwLock<HashMap<(String, u32, u64), ForecastResult>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        farm_id: &str,
        horizon_months: u32,
        model_version: u64,
    ) -> Option<ForecastResult> {
        self.entries
            .read()
            .await
            .get(&(farm_id.to_string(), horizon_months, model_version))
            .cloned()
    }

    pub async fn put(&self, result: ForecastResult) {
        let key = (
            result.farm_id.clone(),
            result.horizon_months,
            result.model_version,
        );
        self.entries.write().await.insert(key, result);
    }

    /// Drop every cached forecast for one farm, after its history changes
    pub async fn invalidate_farm(&self, farm_id: &str) {
        self.entries
            .write()
            .await
            .retain(|(farm, _, _), _| farm != farm_id);
    }

    /// Drop everything, after a new model installs
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

// ============================================================================
// Forecast Pipeline
// ============================================================================

/// Assemble a forecast from already-loaded history and weather context.
///
/// This is the whole request-time computation with storage factored out:
/// the same inputs always produce the same result. Model-level errors
/// propagate unchanged.
pub fn assemble_forecast(
    farm_id: &str,
    history: &[HarvestRecord],
    window: &[WeatherObservation],
    model: &TrainedModel,
    horizon_months: u32,
    today: NaiveDate,
    generated_at: DateTime<Utc>,
) -> AppResult<ForecastResult> {
    let latest = history
        .iter()
        .max_by_key(|r| (r.harvest_date, r.recorded_at))
        .ok_or_else(|| AppError::NoHistory(farm_id.to_string()))?;

    let target_date = today
        .checked_add_months(Months::new(horizon_months))
        .ok_or_else(|| AppError::Validation {
            field: "horizon_months".to_string(),
            message: "Forecast target date is out of range".to_string(),
        })?;

    // Stored records passed ingestion validation, so a build failure here
    // means the store itself is inconsistent
    let features = FeatureBuilder::build_for_horizon(latest, window, target_date)
        .map_err(|msg| AppError::Internal(format!("Stored record failed feature assembly: {}", msg)))?;

    let prediction = model.predict(&features, horizon_months)?;

    Ok(ForecastResult {
        farm_id: farm_id.to_string(),
        horizon_months,
        predicted_yield: prediction.predicted,
        lower_bound: prediction.lower,
        upper_bound: prediction.upper,
        model_version: model.version(),
        generated_at,
    })
}

// ============================================================================
// Forecast Service
// ============================================================================

#[derive(Clone)]
pub struct ForecastService {
    records: RecordService,
    weather: WeatherContextService,
    model: Arc<ModelSlot>,
    cache: Arc<ForecastCache>,
    config: Arc<Config>,
}

impl ForecastService {
    pub fn new(
        db: PgPool,
        config: Arc<Config>,
        model: Arc<ModelSlot>,
        cache: Arc<ForecastCache>,
    ) -> Self {
        Self {
            records: RecordService::new(db.clone()),
            weather: WeatherContextService::from_config(db, &config.weather),
            model,
            cache,
            config,
        }
    }

    /// Forecast yield density for a farm at a horizon in months
    pub async fn forecast(&self, farm_id: &str, horizon_months: u32) -> AppResult<ForecastResult> {
        validate_farm_code(farm_id).map_err(|msg| AppError::Validation {
            field: "farm_id".to_string(),
            message: msg.to_string(),
        })?;
        validate_horizon_months(horizon_months, self.config.forecast.horizon_max_months).map_err(
            |msg| AppError::Validation {
                field: "horizon_months".to_string(),
                message: msg.to_string(),
            },
        )?;

        let model = self.model.current().await;

        if let Some(ref model) = model {
            if let Some(hit) = self.cache.get(farm_id, horizon_months, model.version()).await {
                tracing::debug!(
                    "Forecast cache hit for {} at {} months (model v{})",
                    farm_id,
                    horizon_months,
                    model.version()
                );
                return Ok(hit);
            }
        }

        let limit = Duration::from_secs(self.config.forecast.operation_timeout_secs);
        let history = bounded(
            "harvest record query",
            limit,
            self.records.query(farm_id, None),
        )
        .await?;
        if history.is_empty() {
            return Err(AppError::NoHistory(farm_id.to_string()));
        }

        let model = match model {
            Some(model) => model,
            None => {
                // History exists but no model has been trained yet
                self.model.request_retrain();
                return Err(AppError::ModelUnavailable);
            }
        };

        let today = Utc::now().date_naive();
        let window_range = DateRange::new(
            today - chrono::Duration::days(RECENT_WEATHER_DAYS),
            today,
        );
        let window = bounded(
            "weather window query",
            limit,
            self.weather.window(farm_id, window_range),
        )
        .await?;

        let result = match assemble_forecast(
            farm_id,
            &history,
            &window,
            &model,
            horizon_months,
            today,
            Utc::now(),
        ) {
            Ok(result) => result,
            Err(err @ AppError::SchemaMismatch { .. }) => {
                tracing::warn!(
                    "Feature schema ran ahead of model v{}; retrain requested",
                    model.version()
                );
                self.model.request_retrain();
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        self.cache.put(result.clone()).await;
        tracing::info!(
            "Forecast for {} at {} months: {:.2} t/ha [{:.2}, {:.2}] (model v{})",
            farm_id,
            horizon_months,
            result.predicted_yield,
            result.lower_bound,
            result.upper_bound,
            result.model_version
        );

        Ok(result)
    }

    /// Forecast at every horizon from 1 to `max_horizon` months, for chart
    /// rendering. Each horizon lands in the cache individually.
    pub async fn forecast_series(
        &self,
        farm_id: &str,
        max_horizon: u32,
    ) -> AppResult<Vec<ForecastResult>> {
        validate_horizon_months(max_horizon, self.config.forecast.horizon_max_months).map_err(
            |msg| AppError::Validation {
                field: "max_horizon".to_string(),
                message: msg.to_string(),
            },
        )?;

        let mut series = Vec::with_capacity(max_horizon as usize);
        for horizon in 1..=max_horizon {
            series.push(self.forecast(farm_id, horizon).await?);
        }
        Ok(series)
    }
}

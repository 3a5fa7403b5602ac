//! Background model trainer.
//!
//! Retrains the yield model out-of-band so forecast requests never pay for
//! a fit. Cycles are driven by a fixed interval plus on-demand requests
//! placed through the model slot (first boot, schema drift, operator).
//!
//! Architecture:
//! - On wake: pull the training window from the store, derive features,
//!   fit on a blocking thread, swap the new model into the shared slot
//! - A failed or skipped cycle leaves the previous model serving
//! - State is in-memory (`Arc<RwLock<TrainerStatus>>`), exposed via the
//!   model status endpoint

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;

use shared::{
    models::{HarvestRecord, WeatherObservation},
    types::DateRange,
};

use crate::config::Config;
use crate::error::AppError;
use crate::ml::{FeatureBuilder, FeatureVector, ModelSlot, TrainedModel, TrainingConfig};
use crate::services::{bounded, ForecastCache, RecordService, WeatherContextService};

/// Extra months of weather fetched before the record cutoff, so growing
/// periods that began before the window still find their observations
const WEATHER_LOOKBACK_MARGIN_MONTHS: u32 = 12;

// ============================================================================
// Trainer status (in-memory, shared via Arc<RwLock<>>)
// ============================================================================

/// Trainer state, exposed via the model status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct TrainerStatus {
    pub active: bool,
    pub next_scheduled_at: Option<DateTime<Utc>>,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub last_run_completed_at: Option<DateTime<Utc>>,
    pub last_run_duration_ms: Option<u64>,
    /// "trained v3 on 180 records", "skipped: ...", "error: ...", or "pending"
    pub last_outcome: String,
    pub total_runs: u64,
}

impl TrainerStatus {
    pub fn new() -> Self {
        Self {
            active: true,
            next_scheduled_at: None,
            last_run_started_at: None,
            last_run_completed_at: None,
            last_run_duration_ms: None,
            last_outcome: "pending".to_string(),
            total_runs: 0,
        }
    }
}

impl Default for TrainerStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared trainer status handle
pub type SharedTrainerStatus = Arc<RwLock<TrainerStatus>>;

// ============================================================================
// Main trainer loop
// ============================================================================

/// Run the background trainer. This function never returns.
///
/// Should be spawned via `tokio::spawn(run_trainer(...))`. The first cycle
/// runs immediately so a model is available soon after boot.
pub async fn run_trainer(
    pool: PgPool,
    config: Arc<Config>,
    slot: Arc<ModelSlot>,
    cache: Arc<ForecastCache>,
    status: SharedTrainerStatus,
) {
    tracing::info!("Background trainer started");

    let records = RecordService::new(pool.clone());
    let weather = WeatherContextService::from_config(pool, &config.weather);
    let interval = Duration::from_secs(config.forecast.retrain_interval_secs);

    loop {
        let run_started = Utc::now();
        {
            let mut s = status.write().await;
            s.last_run_started_at = Some(run_started);
        }

        let outcome = run_training_cycle(&records, &weather, &config, &slot, &cache).await;

        let duration_ms = (Utc::now() - run_started).num_milliseconds().max(0) as u64;
        {
            let mut s = status.write().await;
            s.last_run_completed_at = Some(Utc::now());
            s.last_run_duration_ms = Some(duration_ms);
            s.last_outcome = outcome.describe();
            s.total_runs += 1;
            s.next_scheduled_at =
                Some(Utc::now() + chrono::Duration::seconds(interval.as_secs() as i64));
        }

        match &outcome {
            TrainingOutcome::Trained {
                version,
                training_records,
                ..
            } => {
                tracing::info!(
                    "Trainer: installed model v{} from {} records in {}ms",
                    version,
                    training_records,
                    duration_ms
                );
            }
            TrainingOutcome::Skipped(reason) => {
                tracing::info!("Trainer: cycle skipped ({})", reason);
            }
            TrainingOutcome::Failed(reason) => {
                tracing::error!("Trainer: cycle failed: {}", reason);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = slot.retrain_requested() => {
                tracing::info!("Trainer: retrain requested ahead of schedule");
            }
        }
    }
}

// ============================================================================
// Training cycle
// ============================================================================

enum TrainingOutcome {
    Trained {
        version: u64,
        training_records: usize,
        holdout_mae: Option<f64>,
    },
    Skipped(String),
    Failed(String),
}

impl TrainingOutcome {
    fn describe(&self) -> String {
        match self {
            TrainingOutcome::Trained {
                version,
                training_records,
                holdout_mae,
            } => {
                let mae = match holdout_mae {
                    Some(mae) => format!("{:.3}", mae),
                    None => "n/a".to_string(),
                };
                format!(
                    "trained v{} on {} records (holdout MAE {})",
                    version, training_records, mae
                )
            }
            TrainingOutcome::Skipped(reason) => format!("skipped: {}", reason),
            TrainingOutcome::Failed(reason) => format!("error: {}", reason),
        }
    }
}

async fn run_training_cycle(
    records: &RecordService,
    weather: &WeatherContextService,
    config: &Config,
    slot: &ModelSlot,
    cache: &ForecastCache,
) -> TrainingOutcome {
    let limit = Duration::from_secs(config.forecast.operation_timeout_secs);
    let today = Utc::now().date_naive();
    let record_cutoff = months_back(today, config.forecast.training_window_months);
    let weather_cutoff = months_back(record_cutoff, WEATHER_LOOKBACK_MARGIN_MONTHS);

    let history = match bounded(
        "training record query",
        limit,
        records.all_since(record_cutoff),
    )
    .await
    {
        Ok(history) => history,
        Err(e) => return TrainingOutcome::Failed(format!("record query: {}", e)),
    };

    let observations = match bounded(
        "training weather query",
        limit,
        weather.all_since(weather_cutoff),
    )
    .await
    {
        Ok(observations) => observations,
        Err(e) => return TrainingOutcome::Failed(format!("weather query: {}", e)),
    };

    let weather_by_farm = group_by_farm(observations);
    let training = build_training_set(&history, &weather_by_farm);

    let version = slot.next_version().await;
    let training_config = TrainingConfig::from(&config.forecast);
    let fit_result =
        tokio::task::spawn_blocking(move || TrainedModel::fit(&training, &training_config, version))
            .await;

    let fitted = match fit_result {
        Ok(Ok(model)) => model,
        Ok(Err(AppError::InsufficientData {
            available,
            required,
        })) => {
            return TrainingOutcome::Skipped(format!(
                "insufficient data, {} of {} required records",
                available, required
            ));
        }
        Ok(Err(e)) => return TrainingOutcome::Failed(e.to_string()),
        Err(e) => return TrainingOutcome::Failed(format!("training task panicked: {}", e)),
    };

    let summary = fitted.summary();
    slot.install(fitted).await;
    cache.clear().await;

    TrainingOutcome::Trained {
        version: summary.version,
        training_records: summary.training_records,
        holdout_mae: summary.holdout_mae,
    }
}

// ============================================================================
// Training set assembly
// ============================================================================

/// Derive `(features, target)` pairs from harvest records and their farms'
/// weather. Records that fail feature assembly are logged and skipped so
/// one corrupt row cannot block retraining.
fn build_training_set(
    history: &[HarvestRecord],
    weather_by_farm: &HashMap<String, Vec<WeatherObservation>>,
) -> Vec<(FeatureVector, f64)> {
    let mut training = Vec::with_capacity(history.len());

    for record in history {
        let empty = Vec::new();
        let farm_observations = weather_by_farm.get(&record.farm_id).unwrap_or(&empty);
        let window = observations_in_growing_period(record, farm_observations);

        let features = match FeatureBuilder::build(record, &window) {
            Ok(features) => features,
            Err(msg) => {
                tracing::warn!(
                    "Trainer: skipping record {} for {}: {}",
                    record.id,
                    record.farm_id,
                    msg
                );
                continue;
            }
        };
        let Some(target) = FeatureBuilder::training_target(record) else {
            tracing::warn!(
                "Trainer: skipping record {} for {}: no yield density",
                record.id,
                record.farm_id
            );
            continue;
        };

        training.push((features, target));
    }

    training
}

/// Observations that fall inside the record's growing period
fn observations_in_growing_period(
    record: &HarvestRecord,
    observations: &[WeatherObservation],
) -> Vec<WeatherObservation> {
    let period = DateRange::new(record.planting_date, record.harvest_date);
    observations
        .iter()
        .filter(|o| period.contains(o.date))
        .cloned()
        .collect()
}

fn group_by_farm(
    observations: Vec<WeatherObservation>,
) -> HashMap<String, Vec<WeatherObservation>> {
    let mut by_farm: HashMap<String, Vec<WeatherObservation>> = HashMap::new();
    for observation in observations {
        by_farm
            .entry(observation.farm_id.clone())
            .or_default()
            .push(observation);
    }
    by_farm
}

fn months_back(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months)).unwrap_or(date)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::CropType;
    use uuid::Uuid;

    fn record(farm: &str, planting: (i32, u32, u32), harvest: (i32, u32, u32)) -> HarvestRecord {
        HarvestRecord {
            id: Uuid::new_v4(),
            farm_id: farm.to_string(),
            crop_type: CropType::Maize,
            planting_date: NaiveDate::from_ymd_opt(planting.0, planting.1, planting.2).unwrap(),
            harvest_date: NaiveDate::from_ymd_opt(harvest.0, harvest.1, harvest.2).unwrap(),
            yield_quantity: Decimal::from(6),
            area_hectares: Decimal::from(2),
            rainfall_mm: Decimal::from(480),
            temperature_avg_c: Decimal::from(21),
            recorded_at: Utc::now(),
        }
    }

    fn observation(farm: &str, date: (i32, u32, u32)) -> WeatherObservation {
        WeatherObservation {
            id: Uuid::new_v4(),
            farm_id: farm.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            rainfall_mm: Decimal::from(10),
            temperature_avg_c: Decimal::from(20),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_growing_period_filter_keeps_in_range_observations() {
        let rec = record("KGL-01", (2024, 3, 1), (2024, 9, 1));
        let observations = vec![
            observation("KGL-01", (2024, 2, 28)),
            observation("KGL-01", (2024, 3, 1)),
            observation("KGL-01", (2024, 6, 15)),
            observation("KGL-01", (2024, 9, 1)),
            observation("KGL-01", (2024, 9, 2)),
        ];

        let window = observations_in_growing_period(&rec, &observations);
        let dates: Vec<NaiveDate> = window.iter().map(|o| o.date).collect();

        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn test_group_by_farm_partitions_observations() {
        let observations = vec![
            observation("KGL-01", (2024, 3, 1)),
            observation("KGL-02", (2024, 3, 1)),
            observation("KGL-01", (2024, 3, 2)),
        ];

        let by_farm = group_by_farm(observations);
        assert_eq!(by_farm.get("KGL-01").map(Vec::len), Some(2));
        assert_eq!(by_farm.get("KGL-02").map(Vec::len), Some(1));
    }

    #[test]
    fn test_training_set_skips_records_that_fail_assembly() {
        let good = record("KGL-01", (2024, 3, 1), (2024, 9, 1));
        // Reversed dates cannot produce features
        let bad = record("KGL-01", (2024, 9, 1), (2024, 3, 1));

        let training = build_training_set(&[good, bad], &HashMap::new());
        assert_eq!(training.len(), 1);
    }

    #[test]
    fn test_training_set_pairs_features_with_density() {
        let rec = record("KGL-01", (2024, 3, 1), (2024, 9, 1));
        let training = build_training_set(&[rec], &HashMap::new());

        assert_eq!(training.len(), 1);
        // 6 tonnes over 2 hectares
        assert_eq!(training[0].1, 3.0);
    }

    #[test]
    fn test_months_back_saturates_instead_of_panicking() {
        let today = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(
            months_back(today, 36),
            NaiveDate::from_ymd_opt(2022, 8, 1).unwrap()
        );
    }

    #[test]
    fn test_outcome_descriptions() {
        let trained = TrainingOutcome::Trained {
            version: 3,
            training_records: 180,
            holdout_mae: Some(0.214),
        };
        assert_eq!(
            trained.describe(),
            "trained v3 on 180 records (holdout MAE 0.214)"
        );

        let skipped = TrainingOutcome::Skipped("insufficient data".to_string());
        assert_eq!(skipped.describe(), "skipped: insufficient data");
    }
}

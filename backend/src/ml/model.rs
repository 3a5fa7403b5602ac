//! Trained model lifecycle
//!
//! `TrainedModel` packages a fitted forest with the feature schema it was
//! trained against and everything needed to attach calibrated uncertainty
//! intervals to a point prediction. `ModelSlot` is the single shared slot
//! the trainer swaps and the forecast service reads; a swap is atomic from
//! the reader's perspective.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use tokio::sync::{Notify, RwLock};

use shared::models::ModelSummary;

use crate::config::ForecastConfig;
use crate::error::{AppError, AppResult};
use crate::ml::features::FeatureVector;
use crate::ml::forest::{ForestParams, RegressionForest};

/// Floor on the interval sigma, in tonnes per hectare. Keeps bounds
/// strictly ordered even when every tree agrees exactly.
const SIGMA_FLOOR: f64 = 0.05;

/// Tuning captured when a model is fitted
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub min_training_records: usize,
    pub tree_count: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub confidence_level: f64,
    pub holdout_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            min_training_records: 20,
            tree_count: 100,
            max_depth: 8,
            min_samples_leaf: 2,
            seed: 42,
            confidence_level: 0.95,
            holdout_fraction: 0.2,
        }
    }
}

impl From<&ForecastConfig> for TrainingConfig {
    fn from(config: &ForecastConfig) -> Self {
        Self {
            min_training_records: config.min_training_records,
            tree_count: config.tree_count,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.seed,
            confidence_level: config.confidence_level,
            holdout_fraction: config.holdout_fraction,
        }
    }
}

/// A point prediction with its uncertainty interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Prediction {
    pub fn interval_width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// A fitted yield model. Opaque to callers: only `predict` and the
/// metadata accessors are exposed.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    forest: RegressionForest,
    version: u64,
    schema_version: u16,
    feature_width: usize,
    residual_std: f64,
    confidence_level: f64,
    trained_at: DateTime<Utc>,
    training_records: usize,
    holdout_mae: Option<f64>,
}

impl TrainedModel {
    /// Fit a model on `(features, yield density)` pairs.
    ///
    /// Errors with InsufficientData below the configured minimum. When the
    /// set is large enough to spare a holdout split, the model records its
    /// mean absolute error on that split; either way residuals over the
    /// full set calibrate the intervals.
    pub fn fit(
        training: &[(FeatureVector, f64)],
        config: &TrainingConfig,
        version: u64,
    ) -> AppResult<Self> {
        if training.len() < config.min_training_records {
            return Err(AppError::InsufficientData {
                available: training.len(),
                required: config.min_training_records,
            });
        }
        if config.tree_count == 0 {
            return Err(AppError::Configuration(
                "forecast.tree_count must be at least 1".to_string(),
            ));
        }

        let schema_version = training[0].0.schema_version;
        let feature_width = training[0].0.width();
        for (features, _) in training {
            if features.schema_version != schema_version || features.width() != feature_width {
                return Err(AppError::SchemaMismatch {
                    expected: describe_schema(schema_version, feature_width),
                    found: describe_schema(features.schema_version, features.width()),
                });
            }
        }

        let rows: Vec<Vec<f64>> = training.iter().map(|(f, _)| f.values.clone()).collect();
        let targets: Vec<f64> = training.iter().map(|(_, y)| *y).collect();
        let n = targets.len();

        // Deterministic holdout split; skipped when it would starve training
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(config.seed);
        indices.shuffle(&mut rng);
        let holdout_len = (n as f64 * config.holdout_fraction).floor() as usize;
        let take_holdout = holdout_len > 0 && n - holdout_len >= config.min_training_records;
        let (holdout_idx, train_idx) = if take_holdout {
            indices.split_at(holdout_len)
        } else {
            indices.split_at(0)
        };

        let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].clone()).collect();
        let train_targets: Vec<f64> = train_idx.iter().map(|&i| targets[i]).collect();

        let params = ForestParams {
            tree_count: config.tree_count,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
        };
        let forest = RegressionForest::fit(&train_rows, &train_targets, &params, config.seed);

        let holdout_mae = if holdout_idx.is_empty() {
            None
        } else {
            let actual: Vec<f64> = holdout_idx.iter().map(|&i| targets[i]).collect();
            let predicted: Vec<f64> = holdout_idx.iter().map(|&i| forest.predict(&rows[i])).collect();
            Some(mae(&actual, &predicted))
        };

        let residuals: Vec<f64> = rows
            .iter()
            .zip(targets.iter())
            .map(|(x, y)| y - forest.predict(x))
            .collect();
        let residual_std = std_dev(&residuals);

        Ok(Self {
            forest,
            version,
            schema_version,
            feature_width,
            residual_std,
            confidence_level: config.confidence_level,
            trained_at: Utc::now(),
            training_records: n,
            holdout_mae,
        })
    }

    /// Predict yield density for one feature vector at a horizon.
    ///
    /// The point estimate is the ensemble mean clamped to non-negative.
    /// The interval is `z * sigma * sqrt(horizon)` around the point, where
    /// sigma blends per-tree spread with the training residual spread, so
    /// intervals widen monotonically as the horizon grows.
    pub fn predict(&self, features: &FeatureVector, horizon_months: u32) -> AppResult<Prediction> {
        if features.schema_version != self.schema_version || features.width() != self.feature_width
        {
            return Err(AppError::SchemaMismatch {
                expected: self.schema_description(),
                found: describe_schema(features.schema_version, features.width()),
            });
        }
        if horizon_months == 0 {
            return Err(AppError::ValidationError(
                "Forecast horizon must be at least 1 month".to_string(),
            ));
        }

        let per_tree = self.forest.predict_all(&features.values);
        if per_tree.is_empty() {
            return Err(AppError::ModelUnavailable);
        }
        let point = (per_tree.iter().sum::<f64>() / per_tree.len() as f64).max(0.0);

        let spread = std_dev(&per_tree);
        let sigma = spread.max(self.residual_std).max(SIGMA_FLOOR);
        let half_width =
            z_score(self.confidence_level) * sigma * f64::from(horizon_months).sqrt();

        Ok(Prediction {
            predicted: point,
            lower: (point - half_width).max(0.0),
            upper: point + half_width,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn schema_version(&self) -> u16 {
        self.schema_version
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            version: self.version,
            feature_schema_version: self.schema_version,
            trained_at: self.trained_at,
            training_records: self.training_records,
            holdout_mae: self.holdout_mae,
        }
    }

    fn schema_description(&self) -> String {
        describe_schema(self.schema_version, self.feature_width)
    }
}

fn describe_schema(version: u16, width: usize) -> String {
    format!("v{} ({} slots)", version, width)
}

/// Z-score for a confidence level (normal approximation)
fn z_score(confidence_level: f64) -> f64 {
    match confidence_level {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.282,
        _ => 1.96,
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Mean absolute error
fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Shared slot holding the current model.
///
/// The trainer is the only writer; forecast requests clone the Arc under a
/// read lock, so an in-flight request keeps using the model it started
/// with even if a swap lands mid-request.
pub struct ModelSlot {
    current: RwLock<Option<Arc<TrainedModel>>>,
    retrain: Notify,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            retrain: Notify::new(),
        }
    }

    /// The currently installed model, if any
    pub async fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().await.clone()
    }

    /// Version the next fitted model should carry
    pub async fn next_version(&self) -> u64 {
        match self.current.read().await.as_ref() {
            Some(model) => model.version() + 1,
            None => 1,
        }
    }

    /// Swap in a freshly fitted model
    pub async fn install(&self, model: TrainedModel) {
        *self.current.write().await = Some(Arc::new(model));
    }

    /// Ask the trainer to rebuild the model out-of-band. A request placed
    /// while the trainer is busy is kept until it next waits.
    pub fn request_retrain(&self) {
        self.retrain.notify_one();
    }

    /// Resolves when a retrain has been requested
    pub async fn retrain_requested(&self) {
        self.retrain.notified().await;
    }

    pub async fn summary(&self) -> Option<ModelSummary> {
        self.current.read().await.as_ref().map(|m| m.summary())
    }
}

impl Default for ModelSlot {
    fn default() -> Self {
        Self::new()
    }
}

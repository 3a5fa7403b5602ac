//! Forecast result contracts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A yield forecast for one farm over one horizon.
///
/// This is the contract consumed by report rendering; bounds always satisfy
/// `lower_bound <= predicted_yield <= upper_bound`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub farm_id: String,
    pub horizon_months: u32,
    /// Point estimate in tonnes per hectare
    pub predicted_yield: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Version of the trained model that produced this result
    pub model_version: u64,
    pub generated_at: DateTime<Utc>,
}

impl ForecastResult {
    /// Width of the uncertainty interval
    pub fn interval_width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }

    /// Check the bound ordering invariant
    pub fn bounds_ordered(&self) -> bool {
        self.lower_bound <= self.predicted_yield && self.predicted_yield <= self.upper_bound
    }
}

/// Summary of the currently installed forecast model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub version: u64,
    pub feature_schema_version: u16,
    pub trained_at: DateTime<Utc>,
    pub training_records: usize,
    /// Mean absolute error on the training holdout split, when one was taken
    pub holdout_mae: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_ordered() {
        let result = ForecastResult {
            farm_id: "KGL-01".to_string(),
            horizon_months: 6,
            predicted_yield: 3.9,
            lower_bound: 3.4,
            upper_bound: 4.4,
            model_version: 1,
            generated_at: Utc::now(),
        };
        assert!(result.bounds_ordered());
        assert!((result.interval_width() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_ordered_detects_violation() {
        let result = ForecastResult {
            farm_id: "KGL-01".to_string(),
            horizon_months: 1,
            predicted_yield: 5.0,
            lower_bound: 5.2,
            upper_bound: 5.4,
            model_version: 1,
            generated_at: Utc::now(),
        };
        assert!(!result.bounds_ordered());
    }
}

//! Feature derivation for yield prediction
//!
//! Builds the fixed-width numeric vector the model consumes from a harvest
//! record plus optional weather context. Building is pure and deterministic:
//! the same inputs always produce the same vector, and the wall clock never
//! enters here.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shared::{
    models::{HarvestRecord, WeatherObservation},
    validation::{validate_area_hectares, validate_crop_dates},
};

/// Version of the feature layout below. Bumped whenever a slot is added,
/// removed, or reinterpreted; models remember the version they were trained
/// against and refuse vectors of any other version.
pub const FEATURE_SCHEMA_VERSION: u16 = 1;

/// Number of slots in a schema v1 vector
pub const FEATURE_WIDTH: usize = 9;

// Slot layout for schema v1:
//   0  months since January 2000 of the harvest (or forecast target) date
//   1  calendar month, 1-12
//   2  crop code
//   3  growing period length in days
//   4  area in hectares
//   5  growing period rainfall in mm
//   6  growing period mean temperature in Celsius
//   7  mean rainfall over the weather window
//   8  mean temperature over the weather window

/// A derived feature vector. Never persisted; recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub schema_version: u16,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn width(&self) -> usize {
        self.values.len()
    }
}

/// Derives feature vectors from harvest records and weather context
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build the training vector for one harvest record.
    ///
    /// Validates the record invariants that matter to the model and returns
    /// the violated rule as a static message for the caller to attach to a
    /// validation error.
    pub fn build(
        record: &HarvestRecord,
        window: &[WeatherObservation],
    ) -> Result<FeatureVector, &'static str> {
        validate_crop_dates(record.planting_date, record.harvest_date)?;
        validate_area_hectares(record.area_hectares)?;

        Ok(Self::assemble(record, window, record.harvest_date))
    }

    /// Build the vector used to predict a future month.
    ///
    /// The time slots come from `target_date` while the agronomic slots come
    /// from the farm's most recent record, on the assumption that the next
    /// season resembles the last one in crop, area, and cycle length.
    pub fn build_for_horizon(
        latest: &HarvestRecord,
        window: &[WeatherObservation],
        target_date: NaiveDate,
    ) -> Result<FeatureVector, &'static str> {
        validate_crop_dates(latest.planting_date, latest.harvest_date)?;
        validate_area_hectares(latest.area_hectares)?;

        Ok(Self::assemble(latest, window, target_date))
    }

    /// Training target: yield density in tonnes per hectare.
    /// None when the record has a zero area, which ingestion rejects.
    pub fn training_target(record: &HarvestRecord) -> Option<f64> {
        record.yield_density().and_then(|d| d.to_f64())
    }

    fn assemble(
        record: &HarvestRecord,
        window: &[WeatherObservation],
        time_anchor: NaiveDate,
    ) -> FeatureVector {
        let record_rainfall = dec_f64(record.rainfall_mm);
        let record_temperature = dec_f64(record.temperature_avg_c);
        let (window_rainfall, window_temperature) =
            Self::window_means(window, record_rainfall, record_temperature);

        let values = vec![
            month_index(time_anchor),
            f64::from(time_anchor.month()),
            f64::from(record.crop_type.code()),
            record.growing_days() as f64,
            dec_f64(record.area_hectares),
            record_rainfall,
            record_temperature,
            window_rainfall,
            window_temperature,
        ];

        FeatureVector {
            schema_version: FEATURE_SCHEMA_VERSION,
            values,
        }
    }

    /// Mean rainfall and temperature over a weather window, falling back to
    /// the record's own readings when the window is empty so the builder
    /// stays total and deterministic.
    fn window_means(
        window: &[WeatherObservation],
        fallback_rainfall: f64,
        fallback_temperature: f64,
    ) -> (f64, f64) {
        if window.is_empty() {
            return (fallback_rainfall, fallback_temperature);
        }

        let n = window.len() as f64;
        let rainfall: f64 = window.iter().map(|o| dec_f64(o.rainfall_mm)).sum();
        let temperature: f64 = window.iter().map(|o| dec_f64(o.temperature_avg_c)).sum();
        (rainfall / n, temperature / n)
    }
}

/// Months elapsed since January 2000, the era slot the model uses to place
/// a sample on the long-run trend
fn month_index(date: NaiveDate) -> f64 {
    f64::from((date.year() - 2000) * 12 + date.month0() as i32)
}

fn dec_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

//! Weather data models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::GpsCoordinates;

/// One day of weather context for a farm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub id: Uuid,
    pub farm_id: String,
    pub date: NaiveDate,
    pub rainfall_mm: Decimal,
    pub temperature_avg_c: Decimal,
    pub recorded_at: DateTime<Utc>,
}

/// Current conditions reported by the external weather provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location: GpsCoordinates,
    pub temperature_celsius: Decimal,
    pub humidity_percent: i32,
    pub rainfall_mm: Decimal,
    pub wind_speed_ms: Decimal,
    pub pressure_hpa: i32,
    pub conditions: String,
    pub observed_at: DateTime<Utc>,
}

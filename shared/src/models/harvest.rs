//! Harvest record models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One observed harvest outcome for one farm.
///
/// Records are immutable once stored: corrections are made by appending a
/// new record, never by mutating an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub id: Uuid,
    /// Farm code such as "KGL-01"
    pub farm_id: String,
    pub crop_type: CropType,
    pub planting_date: NaiveDate,
    pub harvest_date: NaiveDate,
    /// Harvested quantity in tonnes
    pub yield_quantity: Decimal,
    /// Cultivated area in hectares
    pub area_hectares: Decimal,
    /// Cumulative rainfall over the growing period in millimetres
    pub rainfall_mm: Decimal,
    /// Mean temperature over the growing period in degrees Celsius
    pub temperature_avg_c: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl HarvestRecord {
    /// Yield density in tonnes per hectare.
    /// Returns None when the area is zero (rejected at ingestion, but the
    /// helper stays total).
    pub fn yield_density(&self) -> Option<Decimal> {
        self.yield_quantity.checked_div(self.area_hectares)
    }

    /// Length of the growing period in days
    pub fn growing_days(&self) -> i64 {
        (self.harvest_date - self.planting_date).num_days()
    }
}

/// Crops tracked by the platform.
///
/// The set is closed so every variant has a stable numeric code; model
/// features encode crops by that code, and adding a variant therefore
/// requires a feature schema version bump.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    Maize,
    Wheat,
    Soybean,
    Rice,
    Beans,
    Coffee,
    Potato,
}

impl CropType {
    /// Stable numeric code used in feature encoding and storage
    pub fn code(&self) -> u8 {
        match self {
            CropType::Maize => 0,
            CropType::Wheat => 1,
            CropType::Soybean => 2,
            CropType::Rice => 3,
            CropType::Beans => 4,
            CropType::Coffee => 5,
            CropType::Potato => 6,
        }
    }

    /// All known crop types, in code order
    pub fn all() -> &'static [CropType] {
        &[
            CropType::Maize,
            CropType::Wheat,
            CropType::Soybean,
            CropType::Rice,
            CropType::Beans,
            CropType::Coffee,
            CropType::Potato,
        ]
    }

    /// Storage identifier (snake_case, matches serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            CropType::Maize => "maize",
            CropType::Wheat => "wheat",
            CropType::Soybean => "soybean",
            CropType::Rice => "rice",
            CropType::Beans => "beans",
            CropType::Coffee => "coffee",
            CropType::Potato => "potato",
        }
    }
}

impl std::fmt::Display for CropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CropType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maize" => Ok(CropType::Maize),
            "wheat" => Ok(CropType::Wheat),
            "soybean" => Ok(CropType::Soybean),
            "rice" => Ok(CropType::Rice),
            "beans" => Ok(CropType::Beans),
            "coffee" => Ok(CropType::Coffee),
            "potato" => Ok(CropType::Potato),
            other => Err(format!("unknown crop type: {}", other)),
        }
    }
}

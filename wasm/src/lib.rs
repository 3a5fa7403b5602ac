//! WebAssembly module for Ibali Farm Platform
//!
//! Provides client-side computation for:
//! - Harvest form validation before submission
//! - Yield density calculations
//! - Forecast interval display helpers
//! - Offline data validation

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Harvest form fields as entered client-side, before type conversion
#[derive(Debug, Deserialize)]
struct HarvestForm {
    farm_id: String,
    crop_type: String,
    planting_date: String,
    harvest_date: String,
    yield_quantity: f64,
    area_hectares: f64,
    rainfall_mm: f64,
    temperature_avg_c: f64,
}

/// Validate a harvest form from JSON, returning the first invalid field
/// name or an empty string when every field passes
#[wasm_bindgen]
pub fn validate_harvest_form(form_json: &str) -> Result<String, JsValue> {
    let form: HarvestForm = serde_json::from_str(form_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid form JSON: {}", e)))?;

    if validate_farm_code(&form.farm_id).is_err() {
        return Ok("farm_id".to_string());
    }
    if CropType::from_str(&form.crop_type).is_err() {
        return Ok("crop_type".to_string());
    }
    let planting = match NaiveDate::from_str(&form.planting_date) {
        Ok(date) => date,
        Err(_) => return Ok("planting_date".to_string()),
    };
    let harvest = match NaiveDate::from_str(&form.harvest_date) {
        Ok(date) => date,
        Err(_) => return Ok("harvest_date".to_string()),
    };
    if validate_crop_dates(planting, harvest).is_err() {
        return Ok("harvest_date".to_string());
    }
    if to_decimal(form.yield_quantity).map_or(true, |v| validate_yield_quantity(v).is_err()) {
        return Ok("yield_quantity".to_string());
    }
    if to_decimal(form.area_hectares).map_or(true, |v| validate_area_hectares(v).is_err()) {
        return Ok("area_hectares".to_string());
    }
    if to_decimal(form.rainfall_mm).map_or(true, |v| validate_rainfall_mm(v).is_err()) {
        return Ok("rainfall_mm".to_string());
    }
    if to_decimal(form.temperature_avg_c).map_or(true, |v| validate_temperature_avg_c(v).is_err()) {
        return Ok("temperature_avg_c".to_string());
    }

    Ok(String::new())
}

/// Check a farm code without submitting the form
#[wasm_bindgen]
pub fn is_valid_farm_code(code: &str) -> bool {
    validate_farm_code(code).is_ok()
}

/// Check whether a crop type name is one the platform tracks
#[wasm_bindgen]
pub fn is_valid_crop_type(name: &str) -> bool {
    CropType::from_str(name).is_ok()
}

/// Check that ISO 8601 planting and harvest dates parse and are ordered
#[wasm_bindgen]
pub fn are_crop_dates_ordered(planting: &str, harvest: &str) -> bool {
    match (NaiveDate::from_str(planting), NaiveDate::from_str(harvest)) {
        (Ok(p), Ok(h)) => validate_crop_dates(p, h).is_ok(),
        _ => false,
    }
}

/// Calculate yield density (tonnes per hectare)
#[wasm_bindgen]
pub fn calculate_yield_density(yield_tonnes: f64, area_hectares: f64) -> f64 {
    if area_hectares <= 0.0 {
        return 0.0;
    }
    yield_tonnes / area_hectares
}

/// Check if a mean temperature falls in the favorable growing band
#[wasm_bindgen]
pub fn is_favorable_temperature(celsius: f64) -> bool {
    let decimal_temp = Decimal::try_from(celsius).unwrap_or(Decimal::from(-100));
    is_favorable_growing_temperature(decimal_temp)
}

/// Width of a forecast uncertainty interval
#[wasm_bindgen]
pub fn forecast_interval_width(lower_bound: f64, upper_bound: f64) -> f64 {
    (upper_bound - lower_bound).max(0.0)
}

/// Format a forecast with its interval for display
#[wasm_bindgen]
pub fn format_forecast_band(predicted: f64, lower_bound: f64, upper_bound: f64) -> String {
    format!(
        "{:.2} t ({:.2} to {:.2})",
        predicted, lower_bound, upper_bound
    )
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_json(farm_id: &str, planting: &str, harvest: &str, area: f64) -> String {
        format!(
            r#"{{"farm_id":"{}","crop_type":"maize","planting_date":"{}","harvest_date":"{}","yield_quantity":6.2,"area_hectares":{},"rainfall_mm":540.0,"temperature_avg_c":21.5}}"#,
            farm_id, planting, harvest, area
        )
    }

    #[test]
    fn test_valid_form_passes() {
        let json = form_json("KGL-01", "2024-03-01", "2024-09-15", 2.0);
        assert_eq!(validate_harvest_form(&json).unwrap(), "");
    }

    #[test]
    fn test_form_flags_bad_farm_code() {
        let json = form_json("kgl-01", "2024-03-01", "2024-09-15", 2.0);
        assert_eq!(validate_harvest_form(&json).unwrap(), "farm_id");
    }

    #[test]
    fn test_form_flags_reversed_dates() {
        let json = form_json("KGL-01", "2024-09-15", "2024-03-01", 2.0);
        assert_eq!(validate_harvest_form(&json).unwrap(), "harvest_date");
    }

    #[test]
    fn test_form_flags_zero_area() {
        let json = form_json("KGL-01", "2024-03-01", "2024-09-15", 0.0);
        assert_eq!(validate_harvest_form(&json).unwrap(), "area_hectares");
    }

    #[test]
    fn test_crop_type_check() {
        assert!(is_valid_crop_type("maize"));
        assert!(is_valid_crop_type("coffee"));
        assert!(!is_valid_crop_type("durian"));
    }

    #[test]
    fn test_crop_dates_check() {
        assert!(are_crop_dates_ordered("2024-03-01", "2024-09-15"));
        assert!(!are_crop_dates_ordered("2024-09-15", "2024-03-01"));
        assert!(!are_crop_dates_ordered("not-a-date", "2024-09-15"));
    }

    #[test]
    fn test_yield_density() {
        let density = calculate_yield_density(6.0, 2.0);
        assert!((density - 3.0).abs() < 0.001);
        assert_eq!(calculate_yield_density(6.0, 0.0), 0.0);
    }

    #[test]
    fn test_favorable_temperature() {
        assert!(is_favorable_temperature(22.0));
        assert!(!is_favorable_temperature(8.0));
        assert!(!is_favorable_temperature(35.0));
    }

    #[test]
    fn test_interval_width() {
        let width = forecast_interval_width(2.8, 3.6);
        assert!((width - 0.8).abs() < 0.001);
        assert_eq!(forecast_interval_width(3.6, 2.8), 0.0);
    }

    #[test]
    fn test_format_forecast_band() {
        assert_eq!(format_forecast_band(3.42, 3.1, 3.74), "3.42 t (3.10 to 3.74)");
    }
}

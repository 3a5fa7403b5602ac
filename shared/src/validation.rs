//! Validation utilities for the Ibali Farm Platform
//!
//! Pure field-level checks applied before a harvest record enters the store
//! or a forecast request reaches the model. Each helper returns a static
//! message so the backend can attach it to the offending field.

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Harvest Record Validations
// ============================================================================

/// Validate farm code format (2-32 chars, uppercase alphanumeric and dashes)
pub fn validate_farm_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Farm code must be at least 2 characters");
    }
    if code.len() > 32 {
        return Err("Farm code must be at most 32 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Farm code must be uppercase alphanumeric with dashes only");
    }
    if code.starts_with('-') || code.ends_with('-') {
        return Err("Farm code cannot start or end with a dash");
    }
    Ok(())
}

/// Validate that the crop was planted before it was harvested
pub fn validate_crop_dates(
    planting_date: NaiveDate,
    harvest_date: NaiveDate,
) -> Result<(), &'static str> {
    if planting_date >= harvest_date {
        return Err("Planting date must be before harvest date");
    }
    Ok(())
}

/// Validate cultivated area (strictly positive, bounded by plausibility)
pub fn validate_area_hectares(area: Decimal) -> Result<(), &'static str> {
    if area <= Decimal::ZERO {
        return Err("Area must be greater than zero hectares");
    }
    if area > Decimal::from(100_000) {
        return Err("Area exceeds plausible farm size");
    }
    Ok(())
}

/// Validate harvested quantity (zero is a valid crop-failure outcome)
pub fn validate_yield_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Yield quantity cannot be negative");
    }
    Ok(())
}

/// Validate cumulative rainfall for a growing period
pub fn validate_rainfall_mm(rainfall: Decimal) -> Result<(), &'static str> {
    if rainfall < Decimal::ZERO {
        return Err("Rainfall cannot be negative");
    }
    if rainfall > Decimal::from(20_000) {
        return Err("Rainfall exceeds plausible cumulative total");
    }
    Ok(())
}

/// Validate mean growing-period temperature
pub fn validate_temperature_avg_c(temperature: Decimal) -> Result<(), &'static str> {
    if temperature < Decimal::from(-50) || temperature > Decimal::from(60) {
        return Err("Temperature outside plausible range");
    }
    Ok(())
}

// ============================================================================
// Forecast Request Validations
// ============================================================================

/// Validate a forecast horizon in months
pub fn validate_horizon_months(horizon: u32, max_horizon: u32) -> Result<(), &'static str> {
    if horizon == 0 {
        return Err("Forecast horizon must be at least 1 month");
    }
    if horizon > max_horizon {
        return Err("Forecast horizon exceeds the configured maximum");
    }
    Ok(())
}

/// Validate a confidence level for uncertainty intervals
pub fn validate_confidence_level(confidence: f64) -> Result<(), &'static str> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err("Confidence level must be strictly between 0 and 1");
    }
    Ok(())
}

// ============================================================================
// Agronomic Helpers
// ============================================================================

/// Check if a mean temperature falls in the broadly favorable growing band
pub fn is_favorable_growing_temperature(temperature: Decimal) -> bool {
    temperature >= Decimal::from(15) && temperature <= Decimal::from(30)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Harvest Record Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_farm_code_valid() {
        assert!(validate_farm_code("KGL-01").is_ok());
        assert!(validate_farm_code("MSZ").is_ok());
        assert!(validate_farm_code("FARM-2024-A").is_ok());
    }

    #[test]
    fn test_validate_farm_code_invalid() {
        assert!(validate_farm_code("K").is_err()); // Too short
        assert!(validate_farm_code("kgl-01").is_err()); // Lowercase
        assert!(validate_farm_code("KGL_01").is_err()); // Underscore
        assert!(validate_farm_code("-KGL").is_err()); // Leading dash
        assert!(validate_farm_code("KGL-").is_err()); // Trailing dash
        assert!(validate_farm_code(&"A".repeat(33)).is_err()); // Too long
    }

    #[test]
    fn test_validate_crop_dates_ordered() {
        let planting = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let harvest = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
        assert!(validate_crop_dates(planting, harvest).is_ok());
    }

    #[test]
    fn test_validate_crop_dates_reversed() {
        let planting = NaiveDate::from_ymd_opt(2024, 9, 20).unwrap();
        let harvest = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(validate_crop_dates(planting, harvest).is_err());
    }

    #[test]
    fn test_validate_crop_dates_equal() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(validate_crop_dates(date, date).is_err());
    }

    #[test]
    fn test_validate_area_hectares() {
        assert!(validate_area_hectares(Decimal::new(25, 1)).is_ok()); // 2.5 ha
        assert!(validate_area_hectares(Decimal::from(500)).is_ok());
        assert!(validate_area_hectares(Decimal::ZERO).is_err());
        assert!(validate_area_hectares(Decimal::from(-3)).is_err());
        assert!(validate_area_hectares(Decimal::from(200_000)).is_err());
    }

    #[test]
    fn test_validate_yield_quantity() {
        assert!(validate_yield_quantity(Decimal::from(12)).is_ok());
        // Total crop failure is a real outcome, not missing data
        assert!(validate_yield_quantity(Decimal::ZERO).is_ok());
        assert!(validate_yield_quantity(Decimal::from(-1)).is_err());
    }

    #[test]
    fn test_validate_rainfall_mm() {
        assert!(validate_rainfall_mm(Decimal::ZERO).is_ok());
        assert!(validate_rainfall_mm(Decimal::from(850)).is_ok());
        assert!(validate_rainfall_mm(Decimal::from(-10)).is_err());
        assert!(validate_rainfall_mm(Decimal::from(30_000)).is_err());
    }

    #[test]
    fn test_validate_temperature_avg_c() {
        assert!(validate_temperature_avg_c(Decimal::from(21)).is_ok());
        assert!(validate_temperature_avg_c(Decimal::from(-5)).is_ok());
        assert!(validate_temperature_avg_c(Decimal::from(-60)).is_err());
        assert!(validate_temperature_avg_c(Decimal::from(70)).is_err());
    }

    // ========================================================================
    // Forecast Request Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_horizon_months() {
        assert!(validate_horizon_months(1, 24).is_ok());
        assert!(validate_horizon_months(6, 24).is_ok());
        assert!(validate_horizon_months(24, 24).is_ok());
        assert!(validate_horizon_months(0, 24).is_err());
        assert!(validate_horizon_months(25, 24).is_err());
    }

    #[test]
    fn test_validate_confidence_level() {
        assert!(validate_confidence_level(0.95).is_ok());
        assert!(validate_confidence_level(0.80).is_ok());
        assert!(validate_confidence_level(0.0).is_err());
        assert!(validate_confidence_level(1.0).is_err());
        assert!(validate_confidence_level(1.5).is_err());
    }

    // ========================================================================
    // Agronomic Helper Tests
    // ========================================================================

    #[test]
    fn test_favorable_growing_temperature() {
        assert!(is_favorable_growing_temperature(Decimal::from(15)));
        assert!(is_favorable_growing_temperature(Decimal::from(22)));
        assert!(is_favorable_growing_temperature(Decimal::from(30)));
        assert!(!is_favorable_growing_temperature(Decimal::from(9)));
        assert!(!is_favorable_growing_temperature(Decimal::from(34)));
    }
}

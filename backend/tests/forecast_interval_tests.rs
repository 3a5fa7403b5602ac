//! Forecast interval tests
//!
//! Tests for uncertainty interval construction including:
//! - Confidence level z-scores
//! - Sigma floor behavior
//! - Horizon widening
//! - Bound ordering on forecast results

use chrono::Utc;
use proptest::prelude::*;
use shared::models::ForecastResult;

// ============================================================================
// Helper Functions (mirroring service implementations)
// ============================================================================

/// Floor on the interval sigma, in tonnes per hectare
const SIGMA_FLOOR: f64 = 0.05;

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

/// Half-width of the uncertainty interval at a horizon
fn interval_half_width(
    spread: f64,
    residual_std: f64,
    confidence_level: f64,
    horizon_months: u32,
) -> f64 {
    let sigma = spread.max(residual_std).max(SIGMA_FLOOR);
    z_score(confidence_level) * sigma * f64::from(horizon_months).sqrt()
}

/// Clamp a raw ensemble mean and half-width into (lower, predicted, upper)
fn bounded_forecast(raw_point: f64, half_width: f64) -> (f64, f64, f64) {
    let predicted = raw_point.max(0.0);
    (
        (predicted - half_width).max(0.0),
        predicted,
        predicted + half_width,
    )
}

fn make_result(raw_point: f64, half_width: f64, horizon_months: u32) -> ForecastResult {
    let (lower, predicted, upper) = bounded_forecast(raw_point, half_width);
    ForecastResult {
        farm_id: "KGL-01".to_string(),
        horizon_months,
        predicted_yield: predicted,
        lower_bound: lower,
        upper_bound: upper,
        model_version: 1,
        generated_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test z-scores follow the confidence table
    #[test]
    fn test_z_scores_follow_confidence_table() {
        assert_eq!(z_score(0.99), 2.576);
        assert_eq!(z_score(0.999), 2.576);
        assert_eq!(z_score(0.95), 1.96);
        assert_eq!(z_score(0.97), 1.96);
        assert_eq!(z_score(0.90), 1.645);
        assert_eq!(z_score(0.80), 1.282);
        // Unrecognized levels fall back to the default band
        assert_eq!(z_score(0.50), 1.96);
    }

    /// Test the sigma floor keeps tight ensembles honest
    #[test]
    fn test_sigma_floor_applies_to_tight_ensembles() {
        let width = interval_half_width(0.0, 0.0, 0.95, 1);
        assert!((width - 1.96 * SIGMA_FLOOR).abs() < 1e-9);
    }

    /// Test the larger of tree spread and residual spread wins
    #[test]
    fn test_larger_spread_dominates() {
        let residual_heavy = interval_half_width(0.1, 0.3, 0.95, 1);
        assert!((residual_heavy - 1.96 * 0.3).abs() < 1e-9);

        let spread_heavy = interval_half_width(0.4, 0.3, 0.95, 1);
        assert!((spread_heavy - 1.96 * 0.4).abs() < 1e-9);
    }

    /// Test intervals widen with the square root of the horizon
    #[test]
    fn test_half_width_scales_with_sqrt_horizon() {
        let one_month = interval_half_width(0.2, 0.1, 0.95, 1);
        let four_months = interval_half_width(0.2, 0.1, 0.95, 4);
        assert!((four_months - 2.0 * one_month).abs() < 1e-9);
    }

    /// Test bounds never cross below zero
    #[test]
    fn test_bounds_clamped_non_negative() {
        let (lower, predicted, upper) = bounded_forecast(0.2, 1.0);
        assert_eq!(lower, 0.0);
        assert!((predicted - 0.2).abs() < 1e-9);
        assert!((upper - 1.2).abs() < 1e-9);

        let (lower, predicted, _) = bounded_forecast(-0.5, 0.3);
        assert_eq!(predicted, 0.0);
        assert_eq!(lower, 0.0);
    }

    /// Test the assembled result satisfies the forecast contract
    #[test]
    fn test_result_contract_holds() {
        let result = make_result(3.4, 0.6, 6);
        assert!(result.bounds_ordered());
        assert!((result.interval_width() - 1.2).abs() < 1e-9);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating per-tree prediction spreads
    fn spread_strategy() -> impl Strategy<Value = f64> {
        0.0..2.0f64
    }

    /// Strategy for generating training residual spreads
    fn residual_strategy() -> impl Strategy<Value = f64> {
        0.0..2.0f64
    }

    /// Strategy for generating raw ensemble means, including slightly
    /// negative ones from sparse extrapolation
    fn raw_point_strategy() -> impl Strategy<Value = f64> {
        -1.0..10.0f64
    }

    /// Strategy for generating the confidence levels the platform supports
    fn confidence_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.80), Just(0.90), Just(0.95), Just(0.99)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: assembled results always keep their bounds ordered
        #[test]
        fn prop_bounds_always_ordered(
            raw_point in raw_point_strategy(),
            spread in spread_strategy(),
            residual in residual_strategy(),
            confidence in confidence_strategy(),
            horizon in 1u32..=24u32
        ) {
            let half = interval_half_width(spread, residual, confidence, horizon);
            let result = make_result(raw_point, half, horizon);

            prop_assert!(result.bounds_ordered());
            prop_assert!(result.lower_bound >= 0.0);
            prop_assert!(result.interval_width() >= 0.0);
        }

        /// Property: a longer horizon strictly widens the interval
        #[test]
        fn prop_longer_horizon_widens(
            spread in spread_strategy(),
            residual in residual_strategy(),
            confidence in confidence_strategy(),
            horizon in 1u32..=23u32
        ) {
            let near = interval_half_width(spread, residual, confidence, horizon);
            let far = interval_half_width(spread, residual, confidence, horizon + 1);

            prop_assert!(far > near);
        }

        /// Property: quadrupling the horizon doubles the half-width
        #[test]
        fn prop_sqrt_horizon_scaling(
            spread in spread_strategy(),
            residual in residual_strategy(),
            confidence in confidence_strategy(),
            horizon in 1u32..=6u32
        ) {
            let base = interval_half_width(spread, residual, confidence, horizon);
            let quadrupled = interval_half_width(spread, residual, confidence, horizon * 4);

            prop_assert!((quadrupled - 2.0 * base).abs() < 1e-9);
        }

        /// Property: the sigma floor lower-bounds every half-width
        #[test]
        fn prop_sigma_floor_is_a_lower_bound(
            spread in spread_strategy(),
            residual in residual_strategy(),
            confidence in confidence_strategy(),
            horizon in 1u32..=24u32
        ) {
            let half = interval_half_width(spread, residual, confidence, horizon);
            let floor = z_score(confidence) * SIGMA_FLOOR * f64::from(horizon).sqrt();

            prop_assert!(half >= floor - 1e-12);
        }

        /// Property: higher confidence never narrows the interval
        #[test]
        fn prop_higher_confidence_never_narrower(
            spread in spread_strategy(),
            residual in residual_strategy(),
            horizon in 1u32..=24u32
        ) {
            let levels = [0.80, 0.90, 0.95, 0.99];
            for pair in levels.windows(2) {
                let narrower = interval_half_width(spread, residual, pair[0], horizon);
                let wider = interval_half_width(spread, residual, pair[1], horizon);
                prop_assert!(wider > narrower);
            }
        }

        /// Property: when nothing clamps, the width is twice the half-width
        #[test]
        fn prop_unclamped_width_is_symmetric(
            raw_point in 5.0..10.0f64,
            spread in 0.0..1.0f64,
            residual in 0.0..1.0f64,
            horizon in 1u32..=4u32
        ) {
            let half = interval_half_width(spread, residual, 0.95, horizon);
            let result = make_result(raw_point, half, horizon);

            // Point sits far enough above zero that the lower clamp is inert
            prop_assert!((result.interval_width() - 2.0 * half).abs() < 1e-9);
        }
    }
}

//! Configuration management for the Ibali Farm Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with IBALI_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,

    /// Forecast pipeline configuration
    pub forecast: ForecastConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Weather API endpoint
    pub api_endpoint: String,

    /// Weather API key (empty disables the external client)
    pub api_key: String,

    /// Default latitude for current-conditions lookups
    pub default_latitude: Decimal,

    /// Default longitude for current-conditions lookups
    pub default_longitude: Decimal,
}

/// Tuning for feature building, model training, and forecast serving
#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    /// Minimum harvest records required before a model may be trained
    pub min_training_records: usize,

    /// Number of trees in the bagged ensemble
    pub tree_count: usize,

    /// Maximum depth of each regression tree
    pub max_depth: usize,

    /// Minimum samples per leaf when splitting
    pub min_samples_leaf: usize,

    /// Seed for reproducible bootstrap sampling
    pub seed: u64,

    /// Confidence level for uncertainty intervals (0 < level < 1)
    pub confidence_level: f64,

    /// Fraction of the training set held out for error measurement
    pub holdout_fraction: f64,

    /// Largest forecast horizon a request may ask for, in months
    pub horizon_max_months: u32,

    /// How far back the trainer looks for records, in months
    pub training_window_months: u32,

    /// Interval between scheduled retrains, in seconds
    pub retrain_interval_secs: u64,

    /// Upper bound on individual store and model operations, in seconds
    pub operation_timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("IBALI_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("weather.api_endpoint", "https://api.openweathermap.org/data/2.5")?
            .set_default("weather.api_key", "")?
            .set_default("weather.default_latitude", "-1.9441")?
            .set_default("weather.default_longitude", "30.0619")?
            .set_default("forecast.min_training_records", 20)?
            .set_default("forecast.tree_count", 100)?
            .set_default("forecast.max_depth", 8)?
            .set_default("forecast.min_samples_leaf", 2)?
            .set_default("forecast.seed", 42)?
            .set_default("forecast.confidence_level", 0.95)?
            .set_default("forecast.holdout_fraction", 0.2)?
            .set_default("forecast.horizon_max_months", 24)?
            .set_default("forecast.training_window_months", 36)?
            .set_default("forecast.retrain_interval_secs", 21_600)?
            .set_default("forecast.operation_timeout_secs", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (IBALI_ prefix)
            .add_source(
                Environment::with_prefix("IBALI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

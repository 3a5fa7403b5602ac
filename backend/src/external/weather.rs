//! Weather API client for fetching current conditions
//!
//! Integrates with the OpenWeatherMap API. Failures surface as external
//! service errors; nothing here ever substitutes fabricated readings.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use shared::{models::CurrentConditions, types::GpsCoordinates};

use crate::error::{AppError, AppResult};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// OpenWeatherMap API response for current weather
#[derive(Debug, Deserialize)]
struct OWMCurrentResponse {
    coord: OWMCoord,
    weather: Vec<OWMWeather>,
    main: OWMMain,
    wind: OWMWind,
    rain: Option<OWMRain>,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct OWMCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OWMWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OWMMain {
    temp: f64,
    pressure: i32,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OWMWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OWMRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

impl WeatherClient {
    /// Create a new WeatherClient against an OpenWeatherMap-compatible
    /// endpoint
    pub fn new(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// Fetch current weather conditions by GPS coordinates
    pub async fn current(&self, location: &GpsCoordinates) -> AppResult<CurrentConditions> {
        let url = format!(
            "{}/weather?lat={}&lon={}&appid={}&units=metric",
            self.base_url, location.latitude, location.longitude, self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("weather request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "weather API returned {}: {}",
                status, body
            )));
        }

        let data: OWMCurrentResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("failed to parse weather response: {}", e))
        })?;

        Ok(convert_current_response(data))
    }
}

/// Convert an OpenWeatherMap current response to our format
fn convert_current_response(data: OWMCurrentResponse) -> CurrentConditions {
    let rainfall = data
        .rain
        .as_ref()
        .and_then(|r| r.one_hour.or(r.three_hour))
        .unwrap_or(0.0);

    CurrentConditions {
        location: GpsCoordinates::new(
            Decimal::from_f64_retain(data.coord.lat).unwrap_or_default(),
            Decimal::from_f64_retain(data.coord.lon).unwrap_or_default(),
        ),
        temperature_celsius: Decimal::from_f64_retain(data.main.temp).unwrap_or_default(),
        humidity_percent: data.main.humidity,
        rainfall_mm: Decimal::from_f64_retain(rainfall).unwrap_or_default(),
        wind_speed_ms: Decimal::from_f64_retain(data.wind.speed).unwrap_or_default(),
        pressure_hpa: data.main.pressure,
        conditions: data
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_default(),
        observed_at: DateTime::from_timestamp(data.dt, 0).unwrap_or_else(Utc::now),
    }
}

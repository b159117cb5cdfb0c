//! Current-weather HTTP client.

use anyhow::{bail, Context, Result};
use dpo_core::WindVector;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response dialect spoken by the configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherProvider {
    /// `wind.speed` / `wind.deg`, keyed by `appid`
    OpenWeatherMap,
    /// `current.wind_speed_10m` / `current.wind_direction_10m`, no key
    OpenMeteo,
}

impl WeatherProvider {
    pub fn detect(url: &str) -> Self {
        if url.contains("openweathermap") {
            WeatherProvider::OpenWeatherMap
        } else {
            WeatherProvider::OpenMeteo
        }
    }
}

/// Union of the response shapes we understand. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherPayload {
    wind: Option<OwmWind>,
    current: Option<OpenMeteoCurrent>,
    current_weather: Option<OpenMeteoLegacy>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoLegacy {
    windspeed: Option<f64>,
    winddirection: Option<f64>,
}

/// Extract the wind reading from a weather payload.
///
/// Missing speed yields `None`; missing direction defaults to 0.
pub fn parse_wind(payload: &WeatherPayload) -> Option<WindVector> {
    let (speed, direction) = if let Some(wind) = &payload.wind {
        (wind.speed, wind.deg)
    } else if let Some(current) = &payload.current {
        (current.wind_speed_10m, current.wind_direction_10m)
    } else if let Some(legacy) = &payload.current_weather {
        (legacy.windspeed, legacy.winddirection)
    } else {
        return None;
    };
    let wind = WindVector::new(speed?, direction.unwrap_or(0.0));
    wind.validate().ok().map(|_| wind)
}

/// HTTP client for the current-weather endpoint.
pub struct WeatherClient {
    client: Client,
    url: String,
    api_key: String,
    provider: WeatherProvider,
}

impl WeatherClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create weather HTTP client")?;
        Ok(Self {
            provider: WeatherProvider::detect(&url),
            client,
            url,
            api_key: api_key.into().trim().to_string(),
        })
    }

    pub fn provider(&self) -> WeatherProvider {
        self.provider
    }

    /// OpenWeatherMap needs a key; without one the lookup is skipped.
    pub fn is_enabled(&self) -> bool {
        !self.url.trim().is_empty()
            && (self.provider != WeatherProvider::OpenWeatherMap || !self.api_key.is_empty())
    }

    /// Current wind at `(lat, lon)`, or `None` when unavailable.
    pub async fn fetch_wind(&self, lat: f64, lon: f64) -> Option<WindVector> {
        if !self.is_enabled() {
            tracing::debug!("Weather lookup disabled; assuming calm wind");
            return None;
        }
        match self.request_wind(lat, lon).await {
            Ok(wind) => {
                tracing::info!(
                    "Wind at ({:.4}, {:.4}): {:.1} m/s from {:.0} deg",
                    lat,
                    lon,
                    wind.speed_mps,
                    wind.direction_deg
                );
                Some(wind)
            }
            Err(err) => {
                tracing::warn!("Weather fetch failed, falling back to calm wind: {:#}", err);
                None
            }
        }
    }

    async fn request_wind(&self, lat: f64, lon: f64) -> Result<WindVector> {
        let request = match self.provider {
            WeatherProvider::OpenWeatherMap => self.client.get(&self.url).query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ]),
            WeatherProvider::OpenMeteo => self.client.get(&self.url).query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("current", "wind_speed_10m,wind_direction_10m".to_string()),
                ("windspeed_unit", "ms".to_string()),
                ("timezone", "UTC".to_string()),
            ]),
        };

        let response = request.send().await.context("weather request failed")?;
        if !response.status().is_success() {
            bail!("weather provider HTTP {}", response.status());
        }
        let payload: WeatherPayload = response
            .json()
            .await
            .context("weather response is not valid JSON")?;
        match parse_wind(&payload) {
            Some(wind) => Ok(wind),
            None => bail!("weather response missing wind speed"),
        }
    }
}

//! Server configuration from environment.

use std::env;
use std::str::FromStr;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
/// Upper bound for `DPO_PLAN_TIMEOUT_S`, one day
pub const MAX_PLAN_TIMEOUT_S: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Current-weather endpoint (OpenWeatherMap or Open-Meteo)
    pub weather_url: String,
    /// Empty disables OpenWeatherMap lookups
    pub weather_api_key: String,
    /// Site location used for the wind query
    pub weather_lat: f64,
    pub weather_lon: f64,
    pub weather_timeout_s: u64,
    pub plan_timeout_s: u64,
    /// Largest accepted width x height
    pub max_grid_cells: usize,
    pub plan_cache_max: usize,
    pub plan_cache_ttl_s: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_api_key: String::new(),
            weather_lat: 51.2465,
            weather_lon: 22.5684,
            weather_timeout_s: 10,
            plan_timeout_s: 60,
            max_grid_cells: 4_000_000,
            plan_cache_max: 64,
            plan_cache_ttl_s: 3600,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("DPO_PORT", defaults.server_port),
            weather_url: env::var("DPO_WEATHER_URL").unwrap_or(defaults.weather_url),
            weather_api_key: env::var("DPO_WEATHER_API_KEY").unwrap_or_default(),
            weather_lat: env_or("DPO_WEATHER_LAT", defaults.weather_lat),
            weather_lon: env_or("DPO_WEATHER_LON", defaults.weather_lon),
            weather_timeout_s: env_or("DPO_WEATHER_TIMEOUT_S", defaults.weather_timeout_s).max(1),
            plan_timeout_s: env_or("DPO_PLAN_TIMEOUT_S", defaults.plan_timeout_s)
                .clamp(1, MAX_PLAN_TIMEOUT_S),
            max_grid_cells: env_or("DPO_MAX_GRID_CELLS", defaults.max_grid_cells),
            plan_cache_max: env_or("DPO_PLAN_CACHE_MAX", defaults.plan_cache_max),
            plan_cache_ttl_s: env_or("DPO_PLAN_CACHE_TTL_S", defaults.plan_cache_ttl_s),
        }
    }
}

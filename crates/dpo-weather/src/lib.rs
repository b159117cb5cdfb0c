//! DPO Weather - current wind lookup
//!
//! Resolves the single wind snapshot used by a planning run. Failures never
//! propagate: callers get `None` and fall back to calm air.

pub mod client;

pub use client::{parse_wind, WeatherClient, WeatherPayload, WeatherProvider};

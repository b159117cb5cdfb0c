//! Wind penalty model.
//!
//! The ambient wind is a single snapshot taken before the run and passed in
//! explicitly; nothing here reads global state.

use crate::error::PlanError;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};

/// Speed at which a full headwind adds 100% to the base cost.
const REFERENCE_SPEED_MPS: f64 = 15.0;
const MIN_MULTIPLIER: f64 = 0.6;

/// Ambient wind: speed in m/s and the bearing it blows from, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindVector {
    pub speed_mps: f64,
    pub direction_deg: f64,
}

impl WindVector {
    pub fn new(speed_mps: f64, direction_deg: f64) -> Self {
        Self {
            speed_mps,
            direction_deg,
        }
    }

    pub fn calm() -> Self {
        Self::default()
    }

    /// Resolve an optional weather reading; missing data means calm air.
    pub fn or_calm(reading: Option<WindVector>) -> Self {
        reading.unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.speed_mps.is_finite() || self.speed_mps < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "wind.speed_mps",
                value: self.speed_mps,
                reason: "must be finite and >= 0",
            });
        }
        if !self.direction_deg.is_finite() {
            return Err(PlanError::InvalidParameter {
                name: "wind.direction_deg",
                value: self.direction_deg,
                reason: "must be finite",
            });
        }
        Ok(())
    }
}

/// Shortest angular distance between two bearings, in [0, 180].
pub fn angular_distance(a_deg: f64, b_deg: f64) -> f64 {
    let diff = (a_deg - b_deg).rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Cost multiplier for a cell facing `aspect_deg` under `wind`.
///
/// `W = max(0.6, 1 + (v / 15) * (delta / 180))`. NaN aspect yields NaN.
pub fn wind_multiplier(wind: &WindVector, aspect_deg: f64) -> f64 {
    if wind.speed_mps == 0.0 {
        return 1.0;
    }
    let delta = angular_distance(aspect_deg, wind.direction_deg);
    (1.0 + (wind.speed_mps / REFERENCE_SPEED_MPS) * (delta / 180.0)).max(MIN_MULTIPLIER)
}

/// Per-cell wind multipliers for an aspect grid.
pub fn wind_grid(aspect_deg: &Grid<f64>, wind: &WindVector) -> Grid<f64> {
    aspect_deg.map(|aspect| {
        if aspect.is_nan() {
            f64::NAN
        } else {
            wind_multiplier(wind, *aspect)
        }
    })
}

/// Compass bearing from `from` to `to`, in [0, 360).
pub fn bearing_deg(from: [f64; 2], to: [f64; 2]) -> f64 {
    let dx = to[0] - from[0];
    let dy = to[1] - from[1];
    let bearing = dx.atan2(dy).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

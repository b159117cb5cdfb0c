//! Tunable parameters for a planning run.

use crate::error::PlanError;
use serde::{Deserialize, Serialize};

/// Slope reclassification table: `thresholds_deg[i]` is the lower bound of
/// class `values[i + 1]`; slopes below the first threshold get `values[0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeClasses {
    pub thresholds_deg: [f64; 3],
    pub values: [f64; 4],
}

impl Default for SlopeClasses {
    fn default() -> Self {
        Self {
            thresholds_deg: [5.0, 15.0, 30.0],
            values: [1.0, 2.0, 4.0, 8.0],
        }
    }
}

impl SlopeClasses {
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut previous = 0.0;
        for threshold in self.thresholds_deg {
            if !threshold.is_finite() || threshold <= previous || threshold >= 90.0 {
                return Err(PlanError::InvalidParameter {
                    name: "slope_classes.thresholds_deg",
                    value: threshold,
                    reason: "thresholds must be strictly increasing within (0, 90)",
                });
            }
            previous = threshold;
        }
        let mut previous = 1.0;
        for value in self.values {
            if !value.is_finite() || value < previous {
                return Err(PlanError::InvalidParameter {
                    name: "slope_classes.values",
                    value,
                    reason: "class values must be finite, >= 1 and non-decreasing",
                });
            }
            previous = value;
        }
        Ok(())
    }
}

/// Configuration for the cost surface, tracer and lifter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Distance obstacle footprints are expanded by, in grid units
    pub obstacle_buffer_m: f64,
    /// Multiplier applied to cost on buffered obstacle cells
    pub obstacle_penalty: f64,
    /// Cost added per unit of vegetation height
    pub vegetation_penalty: f64,
    /// Height above ground of the lifted flight path
    pub flight_height_m: f64,
    pub slope_classes: SlopeClasses,
    /// Reject paths longer than this, when set
    pub max_range_m: Option<f64>,
    /// Stop propagation once the destination is settled; cells beyond the
    /// frontier are then reported as unreached
    pub stop_at_destination: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            obstacle_buffer_m: 10.0,
            obstacle_penalty: 1000.0,
            vegetation_penalty: 3.0,
            flight_height_m: 30.0,
            slope_classes: SlopeClasses::default(),
            max_range_m: None,
            stop_at_destination: false,
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.obstacle_buffer_m.is_finite() || self.obstacle_buffer_m < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "obstacle_buffer_m",
                value: self.obstacle_buffer_m,
                reason: "must be finite and >= 0",
            });
        }
        // Penalties below 1 would make obstacles cheaper than open ground.
        if !self.obstacle_penalty.is_finite() || self.obstacle_penalty < 1.0 {
            return Err(PlanError::InvalidParameter {
                name: "obstacle_penalty",
                value: self.obstacle_penalty,
                reason: "must be finite and >= 1",
            });
        }
        if !self.vegetation_penalty.is_finite() || self.vegetation_penalty < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "vegetation_penalty",
                value: self.vegetation_penalty,
                reason: "must be finite and >= 0",
            });
        }
        if !self.flight_height_m.is_finite() {
            return Err(PlanError::InvalidParameter {
                name: "flight_height_m",
                value: self.flight_height_m,
                reason: "must be finite",
            });
        }
        if let Some(max_range) = self.max_range_m {
            if !max_range.is_finite() || max_range <= 0.0 {
                return Err(PlanError::InvalidParameter {
                    name: "max_range_m",
                    value: max_range,
                    reason: "must be finite and > 0",
                });
            }
        }
        self.slope_classes.validate()
    }
}

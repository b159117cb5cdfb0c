//! Cost surface synthesis.
//!
//! Combines slope class, wind multiplier, vegetation height and the obstacle
//! mask into one traversal cost per cell:
//!
//! ```text
//! V    = 1 + h * p_r
//! cost = S * W * V * P   on obstacle cells
//!      = S * W * V       elsewhere
//! ```
//!
//! Cells with missing elevation are impassable and carry `f64::INFINITY`.

use crate::config::{PlannerConfig, SlopeClasses};
use crate::error::PlanError;
use crate::grid::{CellIndex, Grid};
use crate::terrain::{slope_aspect, slope_class, vegetation_height};
use crate::wind::{wind_grid, WindVector};
use serde::{Deserialize, Serialize};

/// Everything the builder needs besides the rasters, including the frozen
/// wind snapshot for this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSurfaceConfig {
    pub slope_classes: SlopeClasses,
    pub vegetation_penalty: f64,
    pub obstacle_penalty: f64,
    pub wind: WindVector,
}

impl CostSurfaceConfig {
    pub fn from_planner(config: &PlannerConfig, wind: WindVector) -> Self {
        Self {
            slope_classes: config.slope_classes.clone(),
            vegetation_penalty: config.vegetation_penalty,
            obstacle_penalty: config.obstacle_penalty,
            wind,
        }
    }

    /// Checks that make every passable cell cost strictly positive.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !self.vegetation_penalty.is_finite() || self.vegetation_penalty < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "vegetation_penalty",
                value: self.vegetation_penalty,
                reason: "must be finite and >= 0",
            });
        }
        if !self.obstacle_penalty.is_finite() || self.obstacle_penalty < 1.0 {
            return Err(PlanError::InvalidParameter {
                name: "obstacle_penalty",
                value: self.obstacle_penalty,
                reason: "must be finite and >= 1",
            });
        }
        self.wind.validate()?;
        self.slope_classes.validate()
    }
}

#[derive(Debug, Clone)]
pub struct CostSurface {
    pub cost: Grid<f64>,
    pub impassable_cells: usize,
    pub obstacle_cells: usize,
}

impl CostSurface {
    pub fn is_passable(&self, cell: CellIndex) -> bool {
        self.cost.get(cell).is_some_and(|c| c.is_finite())
    }
}

/// Cost of a single passable cell.
pub fn cell_cost(
    slope_class: f64,
    wind_multiplier: f64,
    vegetation_height: f64,
    on_obstacle: bool,
    config: &CostSurfaceConfig,
) -> f64 {
    let vegetation = 1.0 + vegetation_height * config.vegetation_penalty;
    let base = slope_class * wind_multiplier * vegetation;
    if on_obstacle {
        base * config.obstacle_penalty
    } else {
        base
    }
}

pub fn build_cost_surface(
    ground: &Grid<f64>,
    surface: &Grid<f64>,
    obstacles: &Grid<bool>,
    config: &CostSurfaceConfig,
) -> Result<CostSurface, PlanError> {
    let geometry = *ground.geometry();
    geometry.validate()?;
    geometry.ensure_aligned(surface.geometry(), "surface")?;
    geometry.ensure_aligned(obstacles.geometry(), "obstacle mask")?;
    config.validate()?;

    let metrics = slope_aspect(ground);
    let vegetation = vegetation_height(ground, surface)?;
    let wind = wind_grid(&metrics.aspect_deg, &config.wind);

    let mut values = Vec::with_capacity(geometry.len());
    let mut impassable_cells = 0usize;
    let mut obstacle_cells = 0usize;
    for index in 0..geometry.len() {
        let h = vegetation.at_flat(index);
        let w = wind.at_flat(index);
        if h.is_nan() || w.is_nan() {
            values.push(f64::INFINITY);
            impassable_cells += 1;
            continue;
        }
        let slope = metrics.slope_deg.at_flat(index);
        let s = slope_class(slope, &config.slope_classes).ok_or(PlanError::InvalidSlope {
            cell: geometry.cell_at(index),
            slope_deg: slope,
        })?;
        let on_obstacle = obstacles.at_flat(index);
        if on_obstacle {
            obstacle_cells += 1;
        }
        let cost = cell_cost(s, w, h, on_obstacle, config);
        if !cost.is_finite() {
            tracing::warn!(
                "Cost overflow at {} (slope class {}, wind {}, vegetation {}); marking impassable",
                geometry.cell_at(index),
                s,
                w,
                h
            );
            values.push(f64::INFINITY);
            impassable_cells += 1;
            continue;
        }
        debug_assert!(cost > 0.0);
        values.push(cost);
    }

    tracing::debug!(
        "Cost surface {}x{}: {} impassable, {} on obstacles",
        geometry.width,
        geometry.height,
        impassable_cells,
        obstacle_cells
    );

    Ok(CostSurface {
        cost: Grid::from_values(geometry, values)?,
        impassable_cells,
        obstacle_cells,
    })
}

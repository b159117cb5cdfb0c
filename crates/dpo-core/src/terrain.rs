//! Terrain metrics derived from elevation surfaces.
//!
//! Slope uses the maximum-drop rule over the 8-neighborhood and aspect uses
//! central differences. Both fall back to the neighbors that exist, so edge
//! cells and cells bordering NoData are handled by the same formula as the
//! interior rather than a separate edge scheme.

use crate::config::SlopeClasses;
use crate::error::PlanError;
use crate::grid::{CellIndex, Grid, GridGeometry};
use std::f64::consts::SQRT_2;

const NEIGHBORS: [(isize, isize); 8] = [
    (1, -1),
    (1, 0),
    (1, 1),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Per-cell slope (degrees) and aspect (compass degrees of steepest descent).
#[derive(Debug, Clone)]
pub struct TerrainMetrics {
    pub slope_deg: Grid<f64>,
    pub aspect_deg: Grid<f64>,
}

/// Compute slope and aspect for every cell of `ground`.
///
/// Cells whose own elevation is NaN or infinite get NaN for both metrics. Flat cells get
/// aspect 0.
pub fn slope_aspect(ground: &Grid<f64>) -> TerrainMetrics {
    let geometry = *ground.geometry();
    let slope_deg = Grid::from_fn(geometry, |cell| cell_slope(ground, &geometry, cell));
    let aspect_deg = Grid::from_fn(geometry, |cell| cell_aspect(ground, &geometry, cell));
    TerrainMetrics {
        slope_deg,
        aspect_deg,
    }
}

fn valid_elevation(ground: &Grid<f64>, cell: Option<CellIndex>) -> Option<f64> {
    let value = ground.at(cell?);
    value.is_finite().then_some(value)
}

fn cell_slope(ground: &Grid<f64>, geometry: &GridGeometry, cell: CellIndex) -> f64 {
    let Some(z) = valid_elevation(ground, Some(cell)) else {
        return f64::NAN;
    };
    let mut max_gradient: f64 = 0.0;
    for (d_row, d_col) in NEIGHBORS {
        let Some(neighbor) = valid_elevation(ground, geometry.offset(cell, d_row, d_col)) else {
            continue;
        };
        let run = if d_row != 0 && d_col != 0 {
            geometry.cell_size * SQRT_2
        } else {
            geometry.cell_size
        };
        max_gradient = max_gradient.max((neighbor - z).abs() / run);
    }
    max_gradient.atan().to_degrees()
}

/// Directional derivative along one axis: central where both sides exist,
/// one-sided otherwise, zero when isolated.
fn axis_gradient(center: f64, behind: Option<f64>, ahead: Option<f64>, cell_size: f64) -> f64 {
    match (behind, ahead) {
        (Some(b), Some(a)) => (a - b) / (2.0 * cell_size),
        (None, Some(a)) => (a - center) / cell_size,
        (Some(b), None) => (center - b) / cell_size,
        (None, None) => 0.0,
    }
}

fn cell_aspect(ground: &Grid<f64>, geometry: &GridGeometry, cell: CellIndex) -> f64 {
    let Some(z) = valid_elevation(ground, Some(cell)) else {
        return f64::NAN;
    };
    let west = valid_elevation(ground, geometry.offset(cell, 0, -1));
    let east = valid_elevation(ground, geometry.offset(cell, 0, 1));
    let south = valid_elevation(ground, geometry.offset(cell, -1, 0));
    let north = valid_elevation(ground, geometry.offset(cell, 1, 0));

    let dz_dx = axis_gradient(z, west, east, geometry.cell_size);
    let dz_dy = axis_gradient(z, south, north, geometry.cell_size);
    if dz_dx == 0.0 && dz_dy == 0.0 {
        return 0.0;
    }
    // Steepest descent points along -grad(z); bearing is measured clockwise from north.
    let bearing = (-dz_dx).atan2(-dz_dy).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Reclassify a slope angle into its cost class.
///
/// Returns `None` for NaN, negative or >= 90 degree slopes.
pub fn slope_class(slope_deg: f64, classes: &SlopeClasses) -> Option<f64> {
    if !(0.0..90.0).contains(&slope_deg) {
        return None;
    }
    let bucket = classes
        .thresholds_deg
        .iter()
        .take_while(|threshold| slope_deg >= **threshold)
        .count();
    Some(classes.values[bucket])
}

/// Canopy and structure height: `surface - ground`, clamped at zero.
///
/// NaN or infinity in either input becomes NaN so missing data is not mistaken for bare ground.
pub fn vegetation_height(ground: &Grid<f64>, surface: &Grid<f64>) -> Result<Grid<f64>, PlanError> {
    ground
        .geometry()
        .ensure_aligned(surface.geometry(), "surface")?;
    let geometry = *ground.geometry();
    Ok(Grid::from_fn(geometry, |cell| {
        let g = ground.at(cell);
        let s = surface.at(cell);
        if !g.is_finite() || !s.is_finite() {
            f64::NAN
        } else {
            (s - g).max(0.0)
        }
    }))
}

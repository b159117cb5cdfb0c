//! Lifting a planar path to flight altitude.

use crate::grid::Grid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathVertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Ground elevation under each point plus a constant `flight_height_m`.
///
/// `ground` must be the same elevation grid the terrain metrics were derived
/// from. Vertices over NoData keep a NaN height.
pub fn lift_path(ground: &Grid<f64>, points: &[[f64; 2]], flight_height_m: f64) -> Vec<PathVertex> {
    points
        .iter()
        .map(|[x, y]| PathVertex {
            x: *x,
            y: *y,
            z: ground.sample_bilinear(*x, *y) + flight_height_m,
        })
        .collect()
}

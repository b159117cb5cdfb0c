//! End-to-end planning pipeline.
//!
//! Stages run strictly in order, each consuming the finished output of the
//! previous one: obstacle mask, cost surface, cost distance, backtrace and
//! lift. Nothing partial is returned on error.

use crate::config::PlannerConfig;
use crate::cost::{build_cost_surface, CostSurface, CostSurfaceConfig};
use crate::cost_distance::{cost_distance, CostDistance, SearchOptions};
use crate::error::PlanError;
use crate::grid::{CellIndex, GridGeometry};
use crate::lift::{lift_path, PathVertex};
use crate::obstacle::obstacle_mask;
use crate::path::{cells_to_world, path_length, trace_path};
use crate::sources::PlanInputs;
use crate::wind::{bearing_deg, WindVector};
use serde::Serialize;
use std::time::Instant;

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub surface: CostSurface,
    pub distance: CostDistance,
    pub start: CellIndex,
    pub destination: CellIndex,
    pub cells: Vec<CellIndex>,
    pub path_2d: Vec<[f64; 2]>,
    pub path_3d: Vec<PathVertex>,
    pub summary: PlanSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanSummary {
    /// Accumulated cost at the destination
    pub total_cost: f64,
    /// Planar length of the 2D path
    pub length_m: f64,
    /// Straight-line bearing from start to destination
    pub bearing_deg: f64,
    pub settled_cells: usize,
    pub obstacle_cells: usize,
    pub impassable_cells: usize,
    pub wind: WindVector,
    pub elapsed_ms: u64,
}

fn resolve_point(
    geometry: &GridGeometry,
    surface: &CostSurface,
    point: [f64; 2],
    label: &str,
) -> Result<CellIndex, PlanError> {
    let [x, y] = point;
    let cell = geometry.world_to_cell(x, y)?;
    if !surface.is_passable(cell) {
        return Err(PlanError::InvalidCoordinate {
            x,
            y,
            reason: format!("{} point falls on impassable cell {}", label, cell),
        });
    }
    Ok(cell)
}

/// Plan a minimum-cost path from `start_xy` to `end_xy`.
///
/// `wind` is the snapshot used for the whole run. `deadline`, when set, is
/// checked during propagation.
pub fn plan_path(
    inputs: &PlanInputs,
    start_xy: [f64; 2],
    end_xy: [f64; 2],
    wind: WindVector,
    config: &PlannerConfig,
    deadline: Option<Instant>,
) -> Result<PlanOutcome, PlanError> {
    let started = Instant::now();
    config.validate()?;
    wind.validate()?;
    let geometry = *inputs.geometry();
    geometry.validate()?;
    geometry.ensure_aligned(inputs.surface.geometry(), "surface")?;

    // Resolve endpoints before any raster work so bad requests fail fast.
    let start_cell = geometry.world_to_cell(start_xy[0], start_xy[1])?;
    let end_cell = geometry.world_to_cell(end_xy[0], end_xy[1])?;
    if start_cell == end_cell {
        return Err(PlanError::DegenerateInput { cell: start_cell });
    }

    let mask = obstacle_mask(&geometry, &inputs.obstacles, config.obstacle_buffer_m)?;
    let surface_config = CostSurfaceConfig::from_planner(config, wind);
    let surface = build_cost_surface(&inputs.ground, &inputs.surface, &mask, &surface_config)?;
    tracing::debug!(
        "Cost surface ready in {:?} ({} obstacle cells)",
        started.elapsed(),
        surface.obstacle_cells
    );

    let start = resolve_point(&geometry, &surface, start_xy, "start")?;
    let destination = resolve_point(&geometry, &surface, end_xy, "destination")?;

    let options = SearchOptions {
        target: config.stop_at_destination.then_some(destination),
        deadline,
    };
    let distance = cost_distance(&surface.cost, start, &options)?;
    if !distance.is_reached(destination) {
        return Err(PlanError::Unreachable {
            start,
            destination,
            width: geometry.width,
            height: geometry.height,
        });
    }

    let cells = trace_path(&distance, destination)?;
    let path_2d = cells_to_world(&geometry, &cells);
    let length_m = path_length(&path_2d);
    if let Some(max_range_m) = config.max_range_m {
        if length_m > max_range_m {
            return Err(PlanError::RangeExceeded {
                length_m,
                max_range_m,
            });
        }
    }
    let path_3d = lift_path(&inputs.ground, &path_2d, config.flight_height_m);

    let summary = PlanSummary {
        total_cost: distance.accumulated.at(destination),
        length_m,
        bearing_deg: bearing_deg(start_xy, end_xy),
        settled_cells: distance.settled,
        obstacle_cells: surface.obstacle_cells,
        impassable_cells: surface.impassable_cells,
        wind,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        "Planned {} -> {}: {} cells, length {:.1}, cost {:.3}, settled {} in {}ms",
        start,
        destination,
        cells.len(),
        summary.length_m,
        summary.total_cost,
        summary.settled_cells,
        summary.elapsed_ms
    );

    Ok(PlanOutcome {
        surface,
        distance,
        start,
        destination,
        cells,
        path_2d,
        path_3d,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::obstacle::ObstaclePolygon;

    fn flat_inputs(size: usize, obstacles: Vec<ObstaclePolygon>) -> PlanInputs {
        let ground = Grid::filled(GridGeometry::new(size, size, 1.0, 0.0, 0.0), 200.0);
        PlanInputs::new(ground.clone(), ground, obstacles).unwrap()
    }

    fn no_buffer() -> PlannerConfig {
        PlannerConfig {
            obstacle_buffer_m: 0.0,
            ..PlannerConfig::default()
        }
    }

    #[test]
    fn flat_run_lifts_to_flight_height() {
        let inputs = flat_inputs(5, Vec::new());
        let outcome = plan_path(
            &inputs,
            [0.5, 0.5],
            [4.5, 4.5],
            WindVector::calm(),
            &no_buffer(),
            None,
        )
        .unwrap();
        assert_eq!(outcome.cells.len(), 5);
        assert!((outcome.summary.total_cost - 4.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
        assert!((outcome.summary.bearing_deg - 45.0).abs() < 1e-9);
        assert!(outcome.path_3d.iter().all(|v| v.z == 230.0));
        assert_eq!(outcome.path_2d.first(), Some(&[0.5, 0.5]));
    }

    #[test]
    fn same_cell_endpoints_are_degenerate() {
        let inputs = flat_inputs(3, Vec::new());
        let err = plan_path(
            &inputs,
            [1.2, 1.2],
            [1.8, 1.7],
            WindVector::calm(),
            &no_buffer(),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "degenerate_input");
    }

    #[test]
    fn endpoint_on_nodata_is_rejected() {
        let geometry = GridGeometry::new(3, 3, 1.0, 0.0, 0.0);
        let mut values = vec![0.0; 9];
        values[8] = f64::NAN;
        let ground = Grid::from_values(geometry, values).unwrap();
        let inputs = PlanInputs::new(ground.clone(), ground, Vec::new()).unwrap();
        let err = plan_path(
            &inputs,
            [0.5, 0.5],
            [2.5, 2.5],
            WindVector::calm(),
            &no_buffer(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidCoordinate { .. }));
    }

    #[test]
    fn max_range_rejects_long_paths() {
        let inputs = flat_inputs(5, Vec::new());
        let config = PlannerConfig {
            max_range_m: Some(3.0),
            ..no_buffer()
        };
        let err = plan_path(
            &inputs,
            [0.5, 0.5],
            [4.5, 4.5],
            WindVector::calm(),
            &config,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::RangeExceeded { .. }));
    }

    #[test]
    fn invalid_config_fails_before_work() {
        let inputs = flat_inputs(3, Vec::new());
        let config = PlannerConfig {
            vegetation_penalty: -1.0,
            ..PlannerConfig::default()
        };
        let err = plan_path(
            &inputs,
            [0.5, 0.5],
            [2.5, 2.5],
            WindVector::calm(),
            &config,
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_parameter");
    }
}

//! Back-link walk from destination to start.

use crate::cost_distance::{edge_weight, CostDistance, Direction};
use crate::error::PlanError;
use crate::grid::{CellIndex, Grid, GridGeometry};

/// Ordered cells from the start of `distance` to `destination`.
///
/// The walk is bounded to `width * height` steps so a malformed back-link
/// grid fails fast instead of looping.
pub fn trace_path(distance: &CostDistance, destination: CellIndex) -> Result<Vec<CellIndex>, PlanError> {
    let geometry = *distance.back_links.geometry();
    if !geometry.contains(destination) {
        return Err(PlanError::CorruptBackLinks {
            cell: destination,
            steps: 0,
        });
    }
    if destination == distance.start {
        return Err(PlanError::DegenerateInput { cell: destination });
    }
    if !distance.is_reached(destination) {
        return Err(PlanError::Unreachable {
            start: distance.start,
            destination,
            width: geometry.width,
            height: geometry.height,
        });
    }

    let limit = geometry.len();
    let mut cells = vec![destination];
    let mut current = destination;
    let mut steps = 0usize;
    while current != distance.start {
        steps += 1;
        if steps > limit {
            return Err(PlanError::CorruptBackLinks {
                cell: current,
                steps,
            });
        }
        let Some(direction) = distance.back_links.at(current) else {
            return Err(PlanError::CorruptBackLinks {
                cell: current,
                steps,
            });
        };
        let (d_row, d_col) = direction.offset();
        current = geometry
            .offset(current, d_row, d_col)
            .ok_or(PlanError::CorruptBackLinks {
                cell: current,
                steps,
            })?;
        cells.push(current);
    }
    cells.reverse();
    Ok(cells)
}

/// World coordinates of the centers of `cells`.
pub fn cells_to_world(geometry: &GridGeometry, cells: &[CellIndex]) -> Vec<[f64; 2]> {
    cells.iter().map(|cell| geometry.cell_center(*cell)).collect()
}

/// Planar length of a polyline.
pub fn path_length(points: &[[f64; 2]]) -> f64 {
    points
        .windows(2)
        .map(|pair| (pair[1][0] - pair[0][0]).hypot(pair[1][1] - pair[0][1]))
        .sum()
}

fn step_direction(from: CellIndex, to: CellIndex) -> Option<Direction> {
    let d_row = to.row as isize - from.row as isize;
    let d_col = to.col as isize - from.col as isize;
    Direction::ALL
        .into_iter()
        .find(|direction| direction.offset() == (d_row, d_col))
}

/// Re-walk `cells` forward and sum the edge weights.
///
/// Returns `None` if two consecutive cells are not neighbors or a cell is
/// outside `cost`.
pub fn path_cost(cost: &Grid<f64>, cells: &[CellIndex]) -> Option<f64> {
    let mut total = 0.0;
    for pair in cells.windows(2) {
        let direction = step_direction(pair[0], pair[1])?;
        let from = *cost.get(pair[0])?;
        let to = *cost.get(pair[1])?;
        total += edge_weight(cost.cell_size(), direction, from, to);
    }
    Some(total)
}

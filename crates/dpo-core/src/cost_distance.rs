//! Cost-distance propagation over the 8-connected cell graph.
//!
//! A grid-specialized Dijkstra: the graph is implicit (neighbors come from
//! index arithmetic), every cell is settled at most once, and each settled
//! cell stores a compact back-link pointing at its predecessor.
//!
//! Queue order is (accumulated cost, row-major cell index), so equal-cost
//! ties always resolve toward the lower index and results are identical on
//! every run and platform.

use crate::error::PlanError;
use crate::grid::{CellIndex, Grid, GridGeometry};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;
use std::time::Instant;

const DEADLINE_CHECK_INTERVAL: usize = 1024;

/// Compass direction from a cell to one of its eight neighbors.
///
/// Rows grow toward north, so `North` is `(+1, 0)` in `(row, col)` terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// `(d_row, d_col)` offset of the neighbor in this direction.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (1, 0),
            Direction::NorthEast => (1, 1),
            Direction::East => (0, 1),
            Direction::SouthEast => (-1, 1),
            Direction::South => (-1, 0),
            Direction::SouthWest => (-1, -1),
            Direction::West => (0, -1),
            Direction::NorthWest => (1, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (d_row, d_col) = self.offset();
        d_row != 0 && d_col != 0
    }

    /// Travel distance to the neighbor in units of cell size.
    pub fn step_factor(self) -> f64 {
        if self.is_diagonal() {
            SQRT_2
        } else {
            1.0
        }
    }

    /// Conventional back-link raster code: 1 = east, clockwise to 8 = northeast.
    pub fn raster_code(self) -> u8 {
        match self {
            Direction::East => 1,
            Direction::SouthEast => 2,
            Direction::South => 3,
            Direction::SouthWest => 4,
            Direction::West => 5,
            Direction::NorthWest => 6,
            Direction::North => 7,
            Direction::NorthEast => 8,
        }
    }
}

/// Back-link code for a cell, 0 for the source or an unreached cell.
pub fn back_link_code(link: Option<Direction>) -> u8 {
    link.map(Direction::raster_code).unwrap_or(0)
}

/// Edge weight between adjacent cells: travel distance times the mean of the
/// two cell costs.
pub fn edge_weight(cell_size: f64, direction: Direction, from_cost: f64, to_cost: f64) -> f64 {
    cell_size * direction.step_factor() * (from_cost + to_cost) / 2.0
}

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    accumulated: FloatOrd,
    index: usize,
}

/// Optional limits on a propagation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Stop as soon as this cell is settled.
    pub target: Option<CellIndex>,
    /// Abort with [`PlanError::Deadline`] once this instant has passed.
    pub deadline: Option<Instant>,
}

/// Output of a propagation run.
///
/// Unreached cells have infinite accumulated cost and no back-link. When a
/// target stops the run early, cells that were not yet settled are reported
/// as unreached.
#[derive(Debug, Clone)]
pub struct CostDistance {
    pub start: CellIndex,
    pub accumulated: Grid<f64>,
    pub back_links: Grid<Option<Direction>>,
    pub settled: usize,
}

impl CostDistance {
    pub fn is_reached(&self, cell: CellIndex) -> bool {
        self.accumulated.get(cell).is_some_and(|c| c.is_finite())
    }

    /// Accumulated cost at `cell`, if it was reached.
    pub fn cost_at(&self, cell: CellIndex) -> Option<f64> {
        self.accumulated.get(cell).copied().filter(|c| c.is_finite())
    }

    /// Back-link grid encoded as raster codes (see [`Direction::raster_code`]).
    pub fn back_link_codes(&self) -> Grid<u8> {
        self.back_links.map(|link| back_link_code(*link))
    }
}

fn check_endpoint(
    cost: &Grid<f64>,
    cell: CellIndex,
    label: &str,
) -> Result<(), PlanError> {
    let geometry = cost.geometry();
    let [x, y] = if geometry.contains(cell) {
        geometry.cell_center(cell)
    } else {
        [
            geometry.origin_x + cell.col as f64 * geometry.cell_size,
            geometry.origin_y + cell.row as f64 * geometry.cell_size,
        ]
    };
    match cost.get(cell) {
        None => Err(PlanError::InvalidCoordinate {
            x,
            y,
            reason: format!(
                "{} cell {} is outside {}x{} grid",
                label, cell, geometry.width, geometry.height
            ),
        }),
        Some(value) if !value.is_finite() => Err(PlanError::InvalidCoordinate {
            x,
            y,
            reason: format!("{} cell {} is impassable", label, cell),
        }),
        Some(_) => Ok(()),
    }
}

/// Every cell must be strictly positive, finite or `+inf` (impassable).
fn check_costs(cost: &Grid<f64>) -> Result<(), PlanError> {
    let invalid = cost
        .values()
        .iter()
        .position(|value| value.is_nan() || *value <= 0.0);
    match invalid {
        Some(index) => Err(PlanError::InputMismatch(format!(
            "cost {} at {} must be > 0 or +inf",
            cost.at_flat(index),
            cost.geometry().cell_at(index)
        ))),
        None => Ok(()),
    }
}

/// Minimum accumulated cost from `start` to every reachable cell.
///
/// Fails with [`PlanError::InputMismatch`] when any cell cost is NaN, zero
/// or negative.
pub fn cost_distance(
    cost: &Grid<f64>,
    start: CellIndex,
    options: &SearchOptions,
) -> Result<CostDistance, PlanError> {
    let geometry: GridGeometry = *cost.geometry();
    geometry.validate()?;
    check_costs(cost)?;
    check_endpoint(cost, start, "start")?;
    if let Some(target) = options.target {
        check_endpoint(cost, target, "destination")?;
        if target == start {
            return Err(PlanError::DegenerateInput { cell: start });
        }
    }

    let total = geometry.len();
    let mut accumulated = Grid::filled(geometry, f64::INFINITY);
    let mut back_links: Grid<Option<Direction>> = Grid::filled(geometry, None);
    let mut settled = vec![false; total];
    let mut settled_count = 0usize;
    let target_index = options.target.map(|cell| geometry.flat_index(cell));

    let start_index = geometry.flat_index(start);
    accumulated.set_flat(start_index, 0.0);
    let mut open_set: BinaryHeap<Reverse<QueueEntry>> = BinaryHeap::new();
    open_set.push(Reverse(QueueEntry {
        accumulated: FloatOrd(0.0),
        index: start_index,
    }));

    let mut stopped_early = false;
    while let Some(Reverse(entry)) = open_set.pop() {
        let index = entry.index;
        if settled[index] || entry.accumulated.0 > accumulated.at_flat(index) {
            continue;
        }
        settled[index] = true;
        settled_count += 1;

        if let Some(deadline) = options.deadline {
            if (settled_count - 1) % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return Err(PlanError::Deadline {
                    settled: settled_count,
                    total,
                });
            }
        }

        if Some(index) == target_index {
            stopped_early = true;
            break;
        }

        let cell = geometry.cell_at(index);
        let here = entry.accumulated.0;
        let here_cost = cost.at_flat(index);
        for direction in Direction::ALL {
            let (d_row, d_col) = direction.offset();
            let Some(neighbor) = geometry.offset(cell, d_row, d_col) else {
                continue;
            };
            let neighbor_index = geometry.flat_index(neighbor);
            if settled[neighbor_index] {
                continue;
            }
            let neighbor_cost = cost.at_flat(neighbor_index);
            if !neighbor_cost.is_finite() {
                continue;
            }
            let tentative =
                here + edge_weight(geometry.cell_size, direction, here_cost, neighbor_cost);
            if tentative < accumulated.at_flat(neighbor_index) {
                accumulated.set_flat(neighbor_index, tentative);
                back_links.set_flat(neighbor_index, Some(direction.opposite()));
                open_set.push(Reverse(QueueEntry {
                    accumulated: FloatOrd(tentative),
                    index: neighbor_index,
                }));
            }
        }
    }

    if stopped_early {
        for (index, done) in settled.iter().enumerate() {
            if !done {
                accumulated.set_flat(index, f64::INFINITY);
                back_links.set_flat(index, None);
            }
        }
    }

    tracing::debug!(
        "Cost distance from {}: settled {} of {} cells{}",
        start,
        settled_count,
        total,
        if stopped_early { " (stopped at target)" } else { "" }
    );

    Ok(CostDistance {
        start,
        accumulated,
        back_links,
        settled: settled_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn uniform(size: usize, value: f64) -> Grid<f64> {
        Grid::filled(GridGeometry::new(size, size, 1.0, 0.0, 0.0), value)
    }

    #[test]
    fn offsets_and_opposites_agree() {
        for direction in Direction::ALL {
            let (r, c) = direction.offset();
            let (or, oc) = direction.opposite().offset();
            assert_eq!((r + or, c + oc), (0, 0));
            assert_eq!(direction.opposite().opposite(), direction);
        }
        assert_eq!(back_link_code(None), 0);
        assert_eq!(back_link_code(Some(Direction::East)), 1);
        assert_eq!(back_link_code(Some(Direction::NorthEast)), 8);
    }

    #[test]
    fn uniform_grid_diagonal_cost() {
        let cost = uniform(5, 1.0);
        let result = cost_distance(&cost, CellIndex::new(0, 0), &SearchOptions::default()).unwrap();
        assert_eq!(result.cost_at(CellIndex::new(0, 0)), Some(0.0));
        let corner = result.cost_at(CellIndex::new(4, 4)).unwrap();
        assert!((corner - 4.0 * SQRT_2).abs() < 1e-9);
        let edge = result.cost_at(CellIndex::new(0, 4)).unwrap();
        assert!((edge - 4.0).abs() < 1e-9);
        assert_eq!(result.settled, 25);
    }

    #[test]
    fn edge_weight_averages_costs() {
        assert_eq!(edge_weight(2.0, Direction::East, 1.0, 3.0), 4.0);
        assert!((edge_weight(1.0, Direction::NorthEast, 2.0, 2.0) - 2.0 * SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn impassable_cell_forces_detour() {
        let mut cost = uniform(5, 1.0);
        let blocked = cost.geometry().flat_index(CellIndex::new(2, 2));
        cost.set_flat(blocked, f64::INFINITY);
        let result = cost_distance(&cost, CellIndex::new(0, 0), &SearchOptions::default()).unwrap();
        let corner = result.cost_at(CellIndex::new(4, 4)).unwrap();
        assert!(corner > 4.0 * SQRT_2);
        assert!((corner - (3.0 * SQRT_2 + 2.0)).abs() < 1e-9);
        assert!(!result.is_reached(CellIndex::new(2, 2)));
        assert_eq!(result.back_links.at(CellIndex::new(2, 2)), None);
    }

    #[test]
    fn accumulated_cost_grows_along_back_links() {
        let geometry = GridGeometry::new(8, 6, 2.0, 0.0, 0.0);
        let cost = Grid::from_fn(geometry, |c| 1.0 + ((c.row * 7 + c.col * 3) % 5) as f64);
        let result = cost_distance(&cost, CellIndex::new(2, 3), &SearchOptions::default()).unwrap();
        for index in 0..geometry.len() {
            let cell = geometry.cell_at(index);
            if let Some(direction) = result.back_links.at(cell) {
                let (d_row, d_col) = direction.offset();
                let previous = geometry.offset(cell, d_row, d_col).unwrap();
                assert!(result.accumulated.at(previous) <= result.accumulated.at(cell));
            }
        }
        assert_eq!(result.back_links.at(CellIndex::new(2, 3)), None);
    }

    #[test]
    fn runs_are_deterministic() {
        let cost = uniform(9, 1.0);
        let a = cost_distance(&cost, CellIndex::new(4, 4), &SearchOptions::default()).unwrap();
        let b = cost_distance(&cost, CellIndex::new(4, 4), &SearchOptions::default()).unwrap();
        assert_eq!(a.back_links, b.back_links);
        assert_eq!(a.accumulated, b.accumulated);
    }

    #[test]
    fn target_stops_propagation_early() {
        let cost = uniform(20, 1.0);
        let options = SearchOptions {
            target: Some(CellIndex::new(0, 2)),
            deadline: None,
        };
        let result = cost_distance(&cost, CellIndex::new(0, 0), &options).unwrap();
        assert!(result.settled < 400);
        assert!(result.is_reached(CellIndex::new(0, 2)));
        assert!(!result.is_reached(CellIndex::new(19, 19)));
    }

    #[test]
    fn start_on_impassable_cell_is_invalid() {
        let mut cost = uniform(3, 1.0);
        cost.set_flat(0, f64::INFINITY);
        assert!(matches!(
            cost_distance(&cost, CellIndex::new(0, 0), &SearchOptions::default()),
            Err(PlanError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn out_of_bounds_destination_is_invalid() {
        let cost = uniform(3, 1.0);
        let options = SearchOptions {
            target: Some(CellIndex::new(3, 0)),
            deadline: None,
        };
        assert!(matches!(
            cost_distance(&cost, CellIndex::new(0, 0), &options),
            Err(PlanError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn start_equal_to_destination_is_degenerate() {
        let cost = uniform(3, 1.0);
        let options = SearchOptions {
            target: Some(CellIndex::new(1, 1)),
            deadline: None,
        };
        assert_eq!(
            cost_distance(&cost, CellIndex::new(1, 1), &options).unwrap_err(),
            PlanError::DegenerateInput {
                cell: CellIndex::new(1, 1)
            }
        );
    }

    #[test]
    fn enclosed_cell_is_never_reached() {
        let mut cost = uniform(5, 1.0);
        let geometry = *cost.geometry();
        for direction in Direction::ALL {
            let (d_row, d_col) = direction.offset();
            let ring = geometry.offset(CellIndex::new(2, 2), d_row, d_col).unwrap();
            cost.set_flat(geometry.flat_index(ring), f64::INFINITY);
        }
        let options = SearchOptions {
            target: Some(CellIndex::new(2, 2)),
            deadline: None,
        };
        let result = cost_distance(&cost, CellIndex::new(0, 0), &options).unwrap();
        assert!(!result.is_reached(CellIndex::new(2, 2)));
        assert_eq!(result.settled, 16);
    }

    #[test]
    fn non_positive_costs_are_rejected() {
        let geometry = GridGeometry::new(3, 1, 1.0, 0.0, 0.0);
        for bad in [-5.0, 0.0, f64::NAN, f64::NEG_INFINITY] {
            let cost = Grid::from_values(geometry, vec![1.0, bad, 1.0]).unwrap();
            assert!(matches!(
                cost_distance(&cost, CellIndex::new(0, 0), &SearchOptions::default()),
                Err(PlanError::InputMismatch(_))
            ));
        }
    }

    #[test]
    fn accumulated_cost_is_never_negative() {
        let geometry = GridGeometry::new(6, 4, 2.0, 0.0, 0.0);
        let cost = Grid::from_fn(geometry, |c| 0.5 + ((c.row + c.col) % 3) as f64);
        let result = cost_distance(&cost, CellIndex::new(3, 5), &SearchOptions::default()).unwrap();
        assert!(result.accumulated.values().iter().all(|c| *c >= 0.0));
    }

    #[test]
    fn expired_deadline_aborts() {
        let cost = uniform(4, 1.0);
        let options = SearchOptions {
            target: None,
            deadline: Some(Instant::now() - Duration::from_millis(1)),
        };
        assert!(matches!(
            cost_distance(&cost, CellIndex::new(0, 0), &options),
            Err(PlanError::Deadline { .. })
        ));
    }
}

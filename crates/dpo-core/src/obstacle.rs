//! Rasterization of buffered obstacle footprints.

use crate::error::PlanError;
use crate::grid::{CellIndex, Grid, GridGeometry};
use serde::{Deserialize, Serialize};

/// Obstacle footprint as a ring of `[x, y]` vertices in grid world units.
///
/// The ring may be open or closed. Rings with fewer than three vertices
/// still mark cells within the buffer distance of their points and segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstaclePolygon {
    pub ring: Vec<[f64; 2]>,
}

impl ObstaclePolygon {
    pub fn new(ring: Vec<[f64; 2]>) -> Self {
        Self { ring }
    }

    /// Even-odd ray casting against the ring.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = self.ring[i];
            let [xj, yj] = self.ring[j];
            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Shortest distance from `(x, y)` to the ring outline.
    pub fn boundary_distance(&self, x: f64, y: f64) -> f64 {
        match self.ring.len() {
            0 => f64::INFINITY,
            1 => {
                let [px, py] = self.ring[0];
                (x - px).hypot(y - py)
            }
            n => {
                let mut best = f64::INFINITY;
                for i in 0..n {
                    let a = self.ring[i];
                    let b = self.ring[(i + 1) % n];
                    best = best.min(point_segment_distance(x, y, a, b));
                }
                best
            }
        }
    }

    /// True when `(x, y)` lies inside the footprint grown by `buffer`.
    pub fn buffered_contains(&self, x: f64, y: f64, buffer: f64) -> bool {
        self.contains(x, y) || (buffer > 0.0 && self.boundary_distance(x, y) <= buffer)
    }

    fn bounds(&self) -> Option<[f64; 4]> {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for [x, y] in &self.ring {
            if !x.is_finite() || !y.is_finite() {
                return None;
            }
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
            max_x = max_x.max(*x);
            max_y = max_y.max(*y);
        }
        min_x.is_finite().then_some([min_x, min_y, max_x, max_y])
    }
}

fn point_segment_distance(x: f64, y: f64, a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return (x - a[0]).hypot(y - a[1]);
    }
    let t = (((x - a[0]) * dx + (y - a[1]) * dy) / len2).clamp(0.0, 1.0);
    (x - (a[0] + t * dx)).hypot(y - (a[1] + t * dy))
}

/// Flag every cell whose center falls inside a polygon or within `buffer` of it.
pub fn obstacle_mask(
    geometry: &GridGeometry,
    polygons: &[ObstaclePolygon],
    buffer: f64,
) -> Result<Grid<bool>, PlanError> {
    if !buffer.is_finite() || buffer < 0.0 {
        return Err(PlanError::InvalidParameter {
            name: "obstacle_buffer_m",
            value: buffer,
            reason: "must be finite and >= 0",
        });
    }
    let mut mask = Grid::filled(*geometry, false);
    let mut marked = 0usize;

    for (idx, polygon) in polygons.iter().enumerate() {
        let Some([min_x, min_y, max_x, max_y]) = polygon.bounds() else {
            tracing::warn!("Skipping obstacle {} with empty or non-finite ring", idx);
            continue;
        };
        let Some((rows, cols)) = cell_window(geometry, min_x - buffer, min_y - buffer, max_x + buffer, max_y + buffer)
        else {
            continue;
        };
        for row in rows.0..=rows.1 {
            for col in cols.0..=cols.1 {
                let cell = CellIndex { row, col };
                let flat = geometry.flat_index(cell);
                if mask.at_flat(flat) {
                    continue;
                }
                let [x, y] = geometry.cell_center(cell);
                if polygon.buffered_contains(x, y, buffer) {
                    mask.set_flat(flat, true);
                    marked += 1;
                }
            }
        }
    }

    tracing::debug!(
        "Obstacle mask: {} polygons, buffer {}, {} cells flagged",
        polygons.len(),
        buffer,
        marked
    );
    Ok(mask)
}

/// Inclusive row and column ranges of cells whose centers may fall in the box.
#[allow(clippy::type_complexity)]
fn cell_window(
    geometry: &GridGeometry,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<((usize, usize), (usize, usize))> {
    let to_range = |lo: f64, hi: f64, origin: f64, count: usize| -> Option<(usize, usize)> {
        let first = ((lo - origin) / geometry.cell_size - 0.5).ceil().max(0.0);
        let last = ((hi - origin) / geometry.cell_size - 0.5)
            .floor()
            .min(count as f64 - 1.0);
        (first <= last).then_some((first as usize, last as usize))
    };
    let cols = to_range(min_x, max_x, geometry.origin_x, geometry.width)?;
    let rows = to_range(min_y, max_y, geometry.origin_y, geometry.height)?;
    Some((rows, cols))
}

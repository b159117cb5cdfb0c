//! Raster grid model shared by every planning stage.
//!
//! Cells are addressed by `(row, col)` into a flat row-major buffer. The
//! origin is the world coordinate of the lower-left corner of cell `[0, 0]`;
//! columns grow with `x` (east) and rows grow with `y` (north).

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellIndex {
    pub row: usize,
    pub col: usize,
}

impl CellIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row {}, col {})", self.row, self.col)
    }
}

/// Spatial footprint of a grid: dimensions, resolution and origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub cell_size: f64,
    pub origin_x: f64,
    pub origin_y: f64,
}

impl GridGeometry {
    pub fn new(width: usize, height: usize, cell_size: f64, origin_x: f64, origin_y: f64) -> Self {
        Self {
            width,
            height,
            cell_size,
            origin_x,
            origin_y,
        }
    }

    pub fn len(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cell: CellIndex) -> bool {
        cell.row < self.height && cell.col < self.width
    }

    pub fn flat_index(&self, cell: CellIndex) -> usize {
        cell.row * self.width + cell.col
    }

    pub fn cell_at(&self, index: usize) -> CellIndex {
        CellIndex {
            row: index / self.width,
            col: index % self.width,
        }
    }

    /// Neighbor of `cell` shifted by `(d_row, d_col)`, if it is on the grid.
    pub fn offset(&self, cell: CellIndex, d_row: isize, d_col: isize) -> Option<CellIndex> {
        let row = cell.row.checked_add_signed(d_row)?;
        let col = cell.col.checked_add_signed(d_col)?;
        let shifted = CellIndex { row, col };
        self.contains(shifted).then_some(shifted)
    }

    /// Map a world coordinate to the cell containing it.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Result<CellIndex, PlanError> {
        let out_of_bounds = || PlanError::InvalidCoordinate {
            x,
            y,
            reason: format!(
                "outside {}x{} grid at origin ({}, {}) with cell size {}",
                self.width, self.height, self.origin_x, self.origin_y, self.cell_size
            ),
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(out_of_bounds());
        }
        let col = ((x - self.origin_x) / self.cell_size).floor();
        let row = ((y - self.origin_y) / self.cell_size).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return Err(out_of_bounds());
        }
        Ok(CellIndex {
            row: row as usize,
            col: col as usize,
        })
    }

    /// World coordinate of a cell center.
    pub fn cell_center(&self, cell: CellIndex) -> [f64; 2] {
        [
            self.origin_x + (cell.col as f64 + 0.5) * self.cell_size,
            self.origin_y + (cell.row as f64 + 0.5) * self.cell_size,
        ]
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.width == 0 || self.height == 0 {
            return Err(PlanError::InputMismatch(format!(
                "grid has no cells ({}x{})",
                self.width, self.height
            )));
        }
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(PlanError::InputMismatch(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(PlanError::InputMismatch(format!(
                "origin must be finite, got ({}, {})",
                self.origin_x, self.origin_y
            )));
        }
        Ok(())
    }

    /// Ensure `other` is co-registered with this geometry.
    pub fn ensure_aligned(&self, other: &GridGeometry, label: &str) -> Result<(), PlanError> {
        let same_dims = self.width == other.width && self.height == other.height;
        let tolerance = self.cell_size.abs() * 1e-9;
        let same_frame = (self.cell_size - other.cell_size).abs() <= tolerance
            && (self.origin_x - other.origin_x).abs() <= tolerance
            && (self.origin_y - other.origin_y).abs() <= tolerance;
        if same_dims && same_frame {
            return Ok(());
        }
        Err(PlanError::InputMismatch(format!(
            "{} grid {}x{} @ ({}, {}) size {} does not match reference {}x{} @ ({}, {}) size {}",
            label,
            other.width,
            other.height,
            other.origin_x,
            other.origin_y,
            other.cell_size,
            self.width,
            self.height,
            self.origin_x,
            self.origin_y,
            self.cell_size
        )))
    }
}

/// A co-registered raster of cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr<T>")]
pub struct Grid<T> {
    geometry: GridGeometry,
    values: Vec<T>,
}

#[derive(Deserialize)]
struct GridRepr<T> {
    geometry: GridGeometry,
    values: Vec<T>,
}

impl<T> TryFrom<GridRepr<T>> for Grid<T> {
    type Error = PlanError;

    fn try_from(repr: GridRepr<T>) -> Result<Self, Self::Error> {
        Grid::from_values(repr.geometry, repr.values)
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(geometry: GridGeometry, value: T) -> Self {
        Self {
            values: vec![value; geometry.len()],
            geometry,
        }
    }
}

impl<T> Grid<T> {
    /// Wrap a row-major buffer. Fails when the buffer does not match the geometry.
    pub fn from_values(geometry: GridGeometry, values: Vec<T>) -> Result<Self, PlanError> {
        geometry.validate()?;
        if values.len() != geometry.len() {
            return Err(PlanError::InputMismatch(format!(
                "expected {} values for {}x{} grid, got {}",
                geometry.len(),
                geometry.width,
                geometry.height,
                values.len()
            )));
        }
        Ok(Self { geometry, values })
    }

    pub fn from_fn<F>(geometry: GridGeometry, mut f: F) -> Self
    where
        F: FnMut(CellIndex) -> T,
    {
        let values = (0..geometry.len()).map(|i| f(geometry.cell_at(i))).collect();
        Self { geometry, values }
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    pub fn cell_size(&self) -> f64 {
        self.geometry.cell_size
    }

    pub fn get(&self, cell: CellIndex) -> Option<&T> {
        if !self.geometry.contains(cell) {
            return None;
        }
        self.values.get(self.geometry.flat_index(cell))
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            geometry: self.geometry,
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<T: Copy> Grid<T> {
    /// Value at `cell`. Callers must pass an in-bounds cell.
    pub fn at(&self, cell: CellIndex) -> T {
        self.values[self.geometry.flat_index(cell)]
    }

    pub(crate) fn at_flat(&self, index: usize) -> T {
        self.values[index]
    }

    pub(crate) fn set_flat(&mut self, index: usize, value: T) {
        self.values[index] = value;
    }
}

impl Grid<f64> {
    /// Bilinear sample between cell centers, clamped to the grid extent.
    ///
    /// Falls back to the containing cell when any interpolation corner is NaN
    /// or infinite.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let g = &self.geometry;
        if !x.is_finite() || !y.is_finite() {
            return f64::NAN;
        }
        let max_x = (g.width - 1) as f64;
        let max_y = (g.height - 1) as f64;
        let fx = ((x - g.origin_x) / g.cell_size - 0.5).clamp(0.0, max_x);
        let fy = ((y - g.origin_y) / g.cell_size - 0.5).clamp(0.0, max_y);

        let x0 = fx.floor() as usize;
        let y0 = fy.floor() as usize;
        let x1 = (x0 + 1).min(g.width - 1);
        let y1 = (y0 + 1).min(g.height - 1);
        let dx = fx - x0 as f64;
        let dy = fy - y0 as f64;

        let v00 = self.at(CellIndex::new(y0, x0));
        let v10 = self.at(CellIndex::new(y0, x1));
        let v01 = self.at(CellIndex::new(y1, x0));
        let v11 = self.at(CellIndex::new(y1, x1));

        if [v00, v10, v01, v11].iter().any(|v| !v.is_finite()) {
            let col = (fx + 0.5).floor().min(max_x) as usize;
            let row = (fy + 0.5).floor().min(max_y) as usize;
            return self.at(CellIndex::new(row, col));
        }

        let v0 = v00 + (v10 - v00) * dx;
        let v1 = v01 + (v11 - v01) * dx;
        v0 + (v1 - v0) * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> GridGeometry {
        GridGeometry::new(4, 3, 10.0, 100.0, 200.0)
    }

    #[test]
    fn world_to_cell_floors_into_cells() {
        let g = geometry();
        assert_eq!(g.world_to_cell(100.0, 200.0).unwrap(), CellIndex::new(0, 0));
        assert_eq!(g.world_to_cell(139.9, 229.9).unwrap(), CellIndex::new(2, 3));
        assert_eq!(g.world_to_cell(115.0, 205.0).unwrap(), CellIndex::new(0, 1));
    }

    #[test]
    fn world_to_cell_rejects_outside_points() {
        let g = geometry();
        assert!(matches!(
            g.world_to_cell(99.9, 205.0),
            Err(PlanError::InvalidCoordinate { .. })
        ));
        assert!(g.world_to_cell(140.0, 205.0).is_err());
        assert!(g.world_to_cell(120.0, 230.0).is_err());
        assert!(g.world_to_cell(f64::NAN, 205.0).is_err());
    }

    #[test]
    fn cell_center_round_trips() {
        let g = geometry();
        let cell = CellIndex::new(2, 1);
        let [x, y] = g.cell_center(cell);
        assert_eq!(g.world_to_cell(x, y).unwrap(), cell);
    }

    #[test]
    fn from_values_rejects_wrong_length() {
        let err = Grid::from_values(geometry(), vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, PlanError::InputMismatch(_)));
    }

    #[test]
    fn misaligned_origin_is_reported() {
        let a = geometry();
        let mut b = geometry();
        b.origin_x += 5.0;
        assert!(a.ensure_aligned(&a, "surface").is_ok());
        assert!(matches!(
            a.ensure_aligned(&b, "surface"),
            Err(PlanError::InputMismatch(_))
        ));
    }

    #[test]
    fn offset_stays_on_grid() {
        let g = geometry();
        assert_eq!(g.offset(CellIndex::new(0, 0), -1, 0), None);
        assert_eq!(g.offset(CellIndex::new(2, 3), 0, 1), None);
        assert_eq!(
            g.offset(CellIndex::new(1, 1), 1, -1),
            Some(CellIndex::new(2, 0))
        );
    }

    #[test]
    fn bilinear_sample_interpolates_between_centers() {
        let g = GridGeometry::new(2, 1, 10.0, 0.0, 0.0);
        let grid = Grid::from_values(g, vec![0.0, 10.0]).unwrap();
        assert!((grid.sample_bilinear(5.0, 5.0) - 0.0).abs() < 1e-9);
        assert!((grid.sample_bilinear(10.0, 5.0) - 5.0).abs() < 1e-9);
        assert!((grid.sample_bilinear(15.0, 5.0) - 10.0).abs() < 1e-9);
        assert!((grid.sample_bilinear(-50.0, 5.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn bilinear_sample_skips_nan_neighbors() {
        let g = GridGeometry::new(2, 1, 10.0, 0.0, 0.0);
        let grid = Grid::from_values(g, vec![4.0, f64::NAN]).unwrap();
        assert_eq!(grid.sample_bilinear(8.0, 5.0), 4.0);
    }
}

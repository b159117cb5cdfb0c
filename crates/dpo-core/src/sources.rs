//! Input seams for elevation rasters and obstacle footprints.
//!
//! Decoding raster or vector files is left to implementors of these traits.
//! The in-memory versions back the server and the tests.

use crate::error::PlanError;
use crate::grid::{Grid, GridGeometry};
use crate::obstacle::ObstaclePolygon;
use serde::{Deserialize, Serialize};

pub trait RasterSource {
    /// Elevation grid with NoData encoded as NaN.
    fn read_elevation_grid(&self) -> Result<Grid<f64>, PlanError>;
}

pub trait VectorSource {
    fn read_obstacle_polygons(&self) -> Result<Vec<ObstaclePolygon>, PlanError>;
}

#[derive(Debug, Clone)]
pub struct MemoryRaster {
    grid: Grid<f64>,
}

impl MemoryRaster {
    pub fn new(grid: Grid<f64>) -> Self {
        Self { grid }
    }

    /// Build from nullable values, mapping `None` to NaN.
    pub fn from_nullable(geometry: GridGeometry, values: Vec<Option<f64>>) -> Result<Self, PlanError> {
        let values = values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(Self::new(Grid::from_values(geometry, values)?))
    }
}

impl RasterSource for MemoryRaster {
    fn read_elevation_grid(&self) -> Result<Grid<f64>, PlanError> {
        Ok(self.grid.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryVectors {
    polygons: Vec<ObstaclePolygon>,
}

impl MemoryVectors {
    pub fn new(polygons: Vec<ObstaclePolygon>) -> Self {
        Self { polygons }
    }
}

impl VectorSource for MemoryVectors {
    fn read_obstacle_polygons(&self) -> Result<Vec<ObstaclePolygon>, PlanError> {
        Ok(self.polygons.clone())
    }
}

/// Co-registered rasters and obstacle footprints for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInputs {
    pub ground: Grid<f64>,
    pub surface: Grid<f64>,
    pub obstacles: Vec<ObstaclePolygon>,
}

impl PlanInputs {
    pub fn new(
        ground: Grid<f64>,
        surface: Grid<f64>,
        obstacles: Vec<ObstaclePolygon>,
    ) -> Result<Self, PlanError> {
        ground.geometry().validate()?;
        ground
            .geometry()
            .ensure_aligned(surface.geometry(), "surface")?;
        Ok(Self {
            ground,
            surface,
            obstacles,
        })
    }

    pub fn from_sources(
        ground: &dyn RasterSource,
        surface: &dyn RasterSource,
        obstacles: &dyn VectorSource,
    ) -> Result<Self, PlanError> {
        Self::new(
            ground.read_elevation_grid()?,
            surface.read_elevation_grid()?,
            obstacles.read_obstacle_polygons()?,
        )
    }

    pub fn geometry(&self) -> &GridGeometry {
        self.ground.geometry()
    }
}

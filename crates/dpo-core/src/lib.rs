pub mod config;
pub mod cost;
pub mod cost_distance;
pub mod error;
pub mod grid;
pub mod lift;
pub mod obstacle;
pub mod path;
pub mod planner;
pub mod sources;
pub mod terrain;
pub mod wind;

pub use config::{PlannerConfig, SlopeClasses};
pub use cost::{build_cost_surface, cell_cost, CostSurface, CostSurfaceConfig};
pub use cost_distance::{
    back_link_code, cost_distance, edge_weight, CostDistance, Direction, SearchOptions,
};
pub use error::PlanError;
pub use grid::{CellIndex, Grid, GridGeometry};
pub use lift::{lift_path, PathVertex};
pub use obstacle::{obstacle_mask, ObstaclePolygon};
pub use path::{cells_to_world, path_cost, path_length, trace_path};
pub use planner::{plan_path, PlanOutcome, PlanSummary};
pub use sources::{MemoryRaster, MemoryVectors, PlanInputs, RasterSource, VectorSource};
pub use terrain::{slope_aspect, slope_class, vegetation_height, TerrainMetrics};
pub use wind::{angular_distance, bearing_deg, wind_grid, wind_multiplier, WindVector};

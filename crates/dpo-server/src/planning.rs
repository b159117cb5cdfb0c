//! Server-side planning runs on top of the core pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use dpo_core::{
    plan_path, CellIndex, Grid, GridGeometry, MemoryRaster, MemoryVectors, ObstaclePolygon,
    PathVertex, PlanError, PlanInputs, PlanSummary, PlannerConfig, WindVector,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::state::AppState;

/// Body of `POST /v1/plans`.
///
/// Elevation values are row-major with `null` for NoData. When `surface` is
/// omitted the ground grid is reused, i.e. no vegetation.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub grid: GridGeometry,
    pub ground: Vec<Option<f64>>,
    #[serde(default)]
    pub surface: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub obstacles: Vec<ObstaclePolygon>,
    pub start: [f64; 2],
    pub end: [f64; 2],
    #[serde(default)]
    pub config: Option<PlannerConfig>,
    /// Explicit wind; skips the weather lookup
    #[serde(default)]
    pub wind: Option<WindVector>,
    /// Return the cost, accumulated-cost and back-link grids
    #[serde(default)]
    pub include_grids: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindSource {
    Request,
    Weather,
    Calm,
}

/// Output grids, row-major. Unreached or impassable cells are `null`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanGrids {
    pub geometry: GridGeometry,
    pub cost: Vec<Option<f64>>,
    pub accumulated: Vec<Option<f64>>,
    /// 0 for the start or unreached cells, 1 = east clockwise to 8 = northeast
    pub back_links: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub ok: bool,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub start_cell: CellIndex,
    pub destination_cell: CellIndex,
    pub summary: PlanSummary,
    pub wind_source: WindSource,
    pub path: Vec<[f64; 2]>,
    pub path_3d: Vec<PathVertex>,
    pub cells: Vec<CellIndex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grids: Option<PlanGrids>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanListItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub summary: PlanSummary,
    pub vertices: usize,
}

impl From<&PlanResponse> for PlanListItem {
    fn from(plan: &PlanResponse) -> Self {
        Self {
            id: plan.id.clone(),
            created_at: plan.created_at,
            summary: plan.summary,
            vertices: plan.path.len(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanServiceError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("grid of {cells} cells exceeds the limit of {max}")]
    GridTooLarge { cells: usize, max: usize },

    #[error("planning run exceeded {seconds}s timeout")]
    Timeout { seconds: u64 },

    #[error("planning task failed: {0}")]
    Internal(String),
}

impl PlanServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanServiceError::Plan(err) => err.kind(),
            PlanServiceError::GridTooLarge { .. } => "grid_too_large",
            PlanServiceError::Timeout { .. } => "timeout",
            PlanServiceError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PlanServiceError::Plan(err) => match err {
                PlanError::InputMismatch(_)
                | PlanError::InvalidCoordinate { .. }
                | PlanError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                PlanError::DegenerateInput { .. }
                | PlanError::Unreachable { .. }
                | PlanError::RangeExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                PlanError::Deadline { .. } => StatusCode::GATEWAY_TIMEOUT,
                PlanError::InvalidSlope { .. } | PlanError::CorruptBackLinks { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            PlanServiceError::GridTooLarge { .. } => StatusCode::BAD_REQUEST,
            PlanServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PlanServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlanServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "ok": false,
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}

fn nullable(grid: &Grid<f64>) -> Vec<Option<f64>> {
    grid.values()
        .iter()
        .map(|value| value.is_finite().then_some(*value))
        .collect()
}

async fn resolve_wind(state: &AppState, requested: Option<WindVector>) -> (WindVector, WindSource) {
    if let Some(wind) = requested {
        return (wind, WindSource::Request);
    }
    let Some(client) = state.weather() else {
        return (WindVector::calm(), WindSource::Calm);
    };
    let config = state.config();
    match client.fetch_wind(config.weather_lat, config.weather_lon).await {
        Some(wind) => (wind, WindSource::Weather),
        None => (WindVector::calm(), WindSource::Calm),
    }
}

/// Engine deadline for a run, `None` when `timeout` is too large to represent.
fn run_deadline(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Validate a request, run the pipeline on the blocking pool and store the result.
pub async fn run_plan(
    state: &AppState,
    request: PlanRequest,
) -> Result<PlanResponse, PlanServiceError> {
    let config = state.config();
    let cells = request
        .grid
        .width
        .checked_mul(request.grid.height)
        .unwrap_or(usize::MAX);
    if cells > config.max_grid_cells {
        return Err(PlanServiceError::GridTooLarge {
            cells,
            max: config.max_grid_cells,
        });
    }

    let PlanRequest {
        grid,
        ground,
        surface,
        obstacles,
        start,
        end,
        config: planner_config,
        wind,
        include_grids,
    } = request;
    let planner_config = planner_config.unwrap_or_default();
    planner_config.validate()?;

    let surface = match surface {
        Some(values) => MemoryRaster::from_nullable(grid, values)?,
        None => MemoryRaster::from_nullable(grid, ground.clone())?,
    };
    let ground = MemoryRaster::from_nullable(grid, ground)?;
    let inputs = PlanInputs::from_sources(&ground, &surface, &MemoryVectors::new(obstacles))?;

    let (wind, wind_source) = resolve_wind(state, wind).await;

    let timeout = Duration::from_secs(config.plan_timeout_s);
    let deadline = run_deadline(timeout);
    tracing::info!(
        "Planning on {}x{} grid (wind {:.1} m/s from {:.0} deg, {:?})",
        grid.width,
        grid.height,
        wind.speed_mps,
        wind.direction_deg,
        wind_source
    );
    let task = tokio::task::spawn_blocking(move || {
        plan_path(&inputs, start, end, wind, &planner_config, deadline)
    });
    let outcome = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(err)) => return Err(PlanServiceError::Internal(err.to_string())),
        Err(_) => {
            tracing::warn!("Planning run abandoned after {}s", config.plan_timeout_s);
            return Err(PlanServiceError::Timeout {
                seconds: config.plan_timeout_s,
            });
        }
    };

    let grids = include_grids.then(|| PlanGrids {
        geometry: *outcome.surface.cost.geometry(),
        cost: nullable(&outcome.surface.cost),
        accumulated: nullable(&outcome.distance.accumulated),
        back_links: outcome.distance.back_link_codes().into_values(),
    });

    let response = PlanResponse {
        ok: true,
        id: uuid::Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        start_cell: outcome.start,
        destination_cell: outcome.destination,
        summary: outcome.summary,
        wind_source,
        path: outcome.path_2d,
        path_3d: outcome.path_3d,
        cells: outcome.cells,
        grids,
    };
    state.insert_plan(response.clone());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_status_codes() {
        let cases = [
            (
                PlanServiceError::Plan(PlanError::InputMismatch("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                PlanServiceError::Plan(PlanError::RangeExceeded {
                    length_m: 10.0,
                    max_range_m: 5.0,
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PlanServiceError::Plan(PlanError::Deadline {
                    settled: 1,
                    total: 4,
                }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                PlanServiceError::GridTooLarge { cells: 9, max: 4 },
                StatusCode::BAD_REQUEST,
            ),
            (
                PlanServiceError::Internal("panic".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err);
        }
    }

    #[test]
    fn huge_timeout_has_no_deadline() {
        assert_eq!(run_deadline(Duration::MAX), None);
        assert_eq!(run_deadline(Duration::from_secs(u64::MAX)), None);
        assert!(run_deadline(Duration::from_secs(60)).is_some());
    }

    #[test]
    fn core_error_kind_passes_through() {
        let err = PlanServiceError::from(PlanError::DegenerateInput {
            cell: CellIndex::new(1, 1),
        });
        assert_eq!(err.kind(), "degenerate_input");
        assert_eq!(PlanServiceError::Timeout { seconds: 5 }.kind(), "timeout");
    }

    #[test]
    fn request_defaults_optional_fields() {
        let request: PlanRequest = serde_json::from_value(serde_json::json!({
            "grid": {"width": 2, "height": 1, "cell_size": 1.0, "origin_x": 0.0, "origin_y": 0.0},
            "ground": [1.0, null],
            "start": [0.5, 0.5],
            "end": [1.5, 0.5]
        }))
        .unwrap();
        assert!(request.surface.is_none());
        assert!(request.obstacles.is_empty());
        assert!(!request.include_grids);
        assert_eq!(request.ground, vec![Some(1.0), None]);
    }
}

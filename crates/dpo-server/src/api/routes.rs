//! REST API routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dpo_core::PlannerConfig;
use serde_json::json;
use std::sync::Arc;

use crate::planning::{run_plan, PlanListItem, PlanRequest, PlanResponse, PlanServiceError};
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/config/defaults", get(get_config_defaults))
        .route("/v1/plans", get(list_plans).post(create_plan))
        .route("/v1/plans/:id", get(get_plan).delete(delete_plan))
}

fn plan_not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "ok": false,
            "error": format!("plan {} not found", id),
            "kind": "not_found"
        })),
    )
}

async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> Result<(StatusCode, Json<PlanResponse>), PlanServiceError> {
    match run_plan(state.as_ref(), request).await {
        Ok(plan) => Ok((StatusCode::CREATED, Json(plan))),
        Err(err) => {
            tracing::warn!("Plan request failed ({}): {}", err.kind(), err);
            Err(err)
        }
    }
}

async fn list_plans(State(state): State<Arc<AppState>>) -> Json<Vec<PlanListItem>> {
    Json(state.list_plans())
}

async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PlanResponse>, (StatusCode, Json<serde_json::Value>)> {
    state
        .get_plan(&id)
        .map(|plan| Json(plan.as_ref().clone()))
        .ok_or_else(|| plan_not_found(&id))
}

async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<serde_json::Value>)> {
    if state.remove_plan(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(plan_not_found(&id))
    }
}

async fn get_config_defaults(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(json!({
        "planner": PlannerConfig::default(),
        "maxGridCells": config.max_grid_cells,
        "planTimeoutS": config.plan_timeout_s,
        "weatherEnabled": state.weather().is_some(),
        "storedPlans": state.plan_count()
    }))
}

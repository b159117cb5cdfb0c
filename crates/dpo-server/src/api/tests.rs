use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let config = Config {
        weather_api_key: String::new(),
        max_grid_cells: 400,
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config));
    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_plan(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/plans")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn flat_request(size: usize) -> Value {
    json!({
        "grid": {"width": size, "height": size, "cell_size": 1.0, "origin_x": 0.0, "origin_y": 0.0},
        "ground": vec![100.0; size * size],
        "start": [0.5, 0.5],
        "end": [size as f64 - 0.5, size as f64 - 0.5],
        "config": {"obstacle_buffer_m": 0.0}
    })
}

#[tokio::test]
async fn health_check() {
    let (app, _state) = setup_app();
    let res = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_fetch_and_delete_plan() {
    let (app, state) = setup_app();

    let res = app.clone().oneshot(post_plan(flat_request(5))).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["wind_source"], "calm");
    assert_eq!(body["path"].as_array().unwrap().len(), 5);
    assert_eq!(body["path_3d"][0]["z"], 130.0);
    let total = body["summary"]["total_cost"].as_f64().unwrap();
    assert!((total - 4.0 * std::f64::consts::SQRT_2).abs() < 1e-9);
    assert!(body.get("grids").is_none());
    let id = body["id"].as_str().unwrap().to_string();
    assert_eq!(state.plan_count(), 1);

    let res = app
        .clone()
        .oneshot(get(&format!("/v1/plans/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["id"], id.as_str());

    let res = app.clone().oneshot(get("/v1/plans")).await.unwrap();
    let list = read_json(res).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["vertices"], 5);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/v1/plans/{}", id))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .oneshot(get(&format!("/v1/plans/{}", id)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn grids_and_explicit_wind_are_returned() {
    let (app, _state) = setup_app();
    let mut request = flat_request(4);
    request["include_grids"] = json!(true);
    request["wind"] = json!({"speed_mps": 15.0, "direction_deg": 180.0});
    request["ground"][5] = Value::Null;

    let res = app.oneshot(post_plan(request)).await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = read_json(res).await;
    assert_eq!(body["wind_source"], "request");
    let grids = &body["grids"];
    assert_eq!(grids["accumulated"][0], 0.0);
    assert_eq!(grids["accumulated"][5], Value::Null);
    assert_eq!(grids["cost"][5], Value::Null);
    assert_eq!(grids["cost"][0], 2.0);
    assert_eq!(grids["back_links"][0], 0);
    assert_eq!(grids["back_links"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn degenerate_request_is_unprocessable() {
    let (app, _state) = setup_app();
    let mut request = flat_request(4);
    request["end"] = json!([0.7, 0.9]);
    let res = app.oneshot(post_plan(request)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(res).await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["kind"], "degenerate_input");
}

#[tokio::test]
async fn off_grid_point_is_bad_request() {
    let (app, _state) = setup_app();
    let mut request = flat_request(4);
    request["end"] = json!([40.0, 2.0]);
    let res = app.oneshot(post_plan(request)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["kind"], "invalid_coordinate");
}

#[tokio::test]
async fn walled_destination_is_unreachable() {
    let (app, _state) = setup_app();
    let size = 5;
    let ground: Vec<Value> = (0..size * size)
        .map(|i| if i / size == 2 { Value::Null } else { json!(10.0) })
        .collect();
    let mut request = flat_request(size);
    request["ground"] = json!(ground);
    let res = app.oneshot(post_plan(request)).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(res).await["kind"], "unreachable");
}

#[tokio::test]
async fn oversized_grid_is_rejected() {
    let (app, state) = setup_app();
    let res = app.oneshot(post_plan(flat_request(21))).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["kind"], "grid_too_large");
    assert_eq!(state.plan_count(), 0);
}

#[tokio::test]
async fn invalid_config_is_bad_request() {
    let (app, _state) = setup_app();
    let mut request = flat_request(4);
    request["config"] = json!({"obstacle_penalty": 0.2});
    let res = app.oneshot(post_plan(request)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["kind"], "invalid_parameter");
}

#[tokio::test]
async fn config_defaults_are_exposed() {
    let (app, _state) = setup_app();
    let res = app.oneshot(get("/v1/config/defaults")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["planner"]["obstacle_penalty"], 1000.0);
    assert_eq!(body["planner"]["flight_height_m"], 30.0);
    assert_eq!(body["maxGridCells"], 400);
    assert_eq!(body["weatherEnabled"], false);
}

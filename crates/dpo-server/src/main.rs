//! DPO Server - HTTP host for the drone path planner

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dpo_server::{api, config::Config, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("dpo_server=debug".parse()?))
        .init();

    tracing::info!("Starting DPO Server...");

    let config = Config::from_env();
    let port = config.server_port;
    tracing::info!(
        "Limits: {} cells per grid, {}s per run, {} stored plans",
        config.max_grid_cells,
        config.plan_timeout_s,
        config.plan_cache_max
    );
    let state = Arc::new(AppState::new(config));

    let app = api::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

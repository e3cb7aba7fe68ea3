//! graphql-ws-gateway server entry point.
//!
//! Starts the Axum HTTP server with query and subscription endpoints backed
//! by the demo ticker engine.

use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use graphql_ws_gateway::api;
use graphql_ws_gateway::app_state::AppState;
use graphql_ws_gateway::config::GatewayConfig;
use graphql_ws_gateway::engine::{ExecutionEngine, TickerEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting graphql-ws-gateway");

    // Build engine and application state
    let engine: Arc<dyn ExecutionEngine> = Arc::new(TickerEngine::new(Duration::from_millis(
        config.ticker_interval_ms,
    )));
    let app_state = AppState::new(engine, &config);

    // Build router
    let app = api::build_router(&config)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        graphql = %config.graphql_path,
        subscriptions = %config.subscriptions_path,
        "server listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

// Workflow Bridge — HTTP surface (Axum)
//
// Two routes: `GET /health` and `POST /run-workflow`. Workflow failures are
// reported in the response body with HTTP 200; callers inspect `status`.

pub mod handlers;

use crate::bridge::WorkflowBridge;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared state for web handlers.
pub struct WebState {
    pub bridge: WorkflowBridge,
}

/// Build the application router.
pub fn router(bridge: WorkflowBridge) -> Router {
    let state = Arc::new(WebState { bridge });

    Router::new()
        .route("/health", get(handlers::health))
        .route("/run-workflow", post(handlers::run_workflow))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the bridge on an already-bound listener until the process is
/// interrupted.
pub async fn serve(listener: TcpListener, bridge: WorkflowBridge) -> anyhow::Result<()> {
    let app = router(bridge);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Bind `addr` and serve the bridge.
pub async fn start_server(addr: SocketAddr, bridge: WorkflowBridge) -> anyhow::Result<()> {
    tracing::info!(addr = %addr, sdk_loaded = bridge.sdk_loaded(), "Starting workflow bridge");

    let listener = TcpListener::bind(addr).await?;
    serve(listener, bridge).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

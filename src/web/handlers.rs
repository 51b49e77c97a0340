// Workflow Bridge — HTTP handlers

use super::WebState;
use crate::bridge::{HealthStatus, WorkflowRequest, WorkflowResponse};
use axum::extract::State;
use axum::response::Json;
use std::sync::Arc;

/// Liveness plus whether a runner was loaded at start-up.
pub async fn health(State(state): State<Arc<WebState>>) -> Json<HealthStatus> {
    Json(state.bridge.health())
}

/// Run one workflow. Always answers 200 with a `WorkflowResponse`.
pub async fn run_workflow(
    State(state): State<Arc<WebState>>,
    Json(payload): Json<WorkflowRequest>,
) -> Json<WorkflowResponse> {
    Json(state.bridge.run(payload).await)
}

//! HTTP ingress for the relay.
//!
//! Three endpoints, consumed by the benchmark harness and any other client:
//!
//! - `POST /trigger`: enqueue one batch, acknowledge with
//!   `{"status":"queued"}` (acceptance, not completion)
//! - `GET /metrics`: current relay counters as JSON
//! - `GET /workflows`: configured workflow ids, in order

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::domain::BatchTriggerRequest;
use crate::relay::{MetricsSnapshot, Publisher, RelayMetrics};

/// Shared state for the ingress handlers
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<Publisher>,
    pub metrics: Arc<RelayMetrics>,
    pub workflows: Vec<String>,
}

/// Build the ingress router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/trigger", post(trigger))
        .route("/metrics", get(metrics))
        .route("/workflows", get(workflows))
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", bind))?;

    tracing::info!("ingress listening on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await
        .context("ingress server failed")?;

    Ok(())
}

async fn trigger(
    State(state): State<AppState>,
    Json(request): Json<BatchTriggerRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    tracing::debug!(
        "queueing batch of {} records for workflow {}",
        request.inputs.len(),
        request.workflow_id
    );

    match state.publisher.publish(&request).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "queued" }))),
        Err(e) => {
            tracing::error!("failed to queue batch: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn workflows(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.workflows.clone())
}

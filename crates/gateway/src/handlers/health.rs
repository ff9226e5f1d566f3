//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub orchestrator: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - not ready once shutdown has started
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let accepting = state.orchestrator.is_accepting();

    Json(ReadyResponse {
        status: if accepting { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks {
            orchestrator: CheckResult {
                status: if accepting { "accepting" } else { "draining" }.to_string(),
            },
        },
    })
}

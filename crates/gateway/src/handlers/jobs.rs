//! Job status handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use citewalk_common::errors::{AppError, Result};

/// Job status response
#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub papers_collected: usize,
    pub progress_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_at: String,
}

/// Get job status
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResponse>> {
    let job = state
        .orchestrator
        .status(job_id)
        .ok_or_else(|| AppError::JobNotFound {
            id: job_id.to_string(),
        })?;

    Ok(Json(JobResponse {
        job_id: job.id,
        session_id: job.session_id,
        status: job.status.as_str().to_string(),
        current_iteration: job.current_iteration,
        max_iterations: job.max_iterations,
        papers_collected: job.papers_collected,
        progress_percent: job.progress_percent(),
        error_message: job.error_message,
        started_at: job.started_at.map(|dt| dt.to_rfc3339()),
        completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
        created_at: job.created_at.to_rfc3339(),
    }))
}

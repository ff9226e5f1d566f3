//! Crawl submission handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use citewalk_common::config::CrawlRunInputs;
use citewalk_common::errors::Result;

/// Crawl submission request
#[derive(Debug, Deserialize)]
pub struct CreateCrawlRequest {
    /// Caller session to associate the job with; generated when absent
    #[serde(default)]
    pub session_id: Option<Uuid>,

    #[serde(flatten)]
    pub inputs: CrawlRunInputs,
}

/// Crawl submission response
#[derive(Serialize)]
pub struct CreateCrawlResponse {
    pub job_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
}

/// Submit a crawl run. Returns immediately with a job id to poll.
pub async fn create_crawl(
    State(state): State<AppState>,
    Json(request): Json<CreateCrawlRequest>,
) -> Result<(StatusCode, Json<CreateCrawlResponse>)> {
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let job_id = state.orchestrator.submit(session_id, request.inputs)?;

    tracing::info!(
        job_id = %job_id,
        session_id = %session_id,
        "Crawl accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateCrawlResponse {
            job_id,
            session_id,
            status: "running".to_string(),
        }),
    ))
}

//! Result view handlers
//!
//! Read-only views over a completed job's artifacts, backed by the
//! result assembler. Running and failed jobs answer 409 / 404 through
//! the orchestrator's artifact accessor.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use citewalk_common::errors::Result;
use citewalk_crawler::assemble::{Page, PaperQuery, PaperSummary, ResultAssembler, TopicSummary};

#[derive(Serialize)]
pub struct TopicsResponse {
    pub topics: Vec<TopicSummary>,
}

/// List a completed job's papers, paginated
pub async fn list_papers(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<PaperQuery>,
) -> Result<Json<Page<PaperSummary>>> {
    let artifacts = state.orchestrator.artifacts(job_id)?;
    let assembler = ResultAssembler::new(&artifacts);
    Ok(Json(assembler.papers(&query)))
}

/// List a completed job's topic clusters
pub async fn list_topics(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<TopicsResponse>> {
    let artifacts = state.orchestrator.artifacts(job_id)?;
    let assembler = ResultAssembler::new(&artifacts);
    Ok(Json(TopicsResponse {
        topics: assembler.topics(),
    }))
}

/// List papers belonging to one topic cluster, paginated
pub async fn list_topic_papers(
    State(state): State<AppState>,
    Path((job_id, topic_id)): Path<(Uuid, usize)>,
    Query(query): Query<PaperQuery>,
) -> Result<Json<Page<PaperSummary>>> {
    let artifacts = state.orchestrator.artifacts(job_id)?;
    let assembler = ResultAssembler::new(&artifacts);
    Ok(Json(assembler.topic_papers(topic_id, &query)?))
}

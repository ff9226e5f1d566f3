//! Crawl job model
//!
//! Jobs are in-memory for the lifetime of the process. A job is created at
//! submission, mutated only by the crawl worker assigned to it, and read by
//! any caller as a snapshot. Once `Completed` or `Failed` it never changes
//! again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Job status enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// One crawl job
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,

    /// Session that submitted this job
    pub session_id: Uuid,

    pub status: JobStatus,

    /// Completed crawl iterations; never exceeds `max_iterations`
    pub current_iteration: u32,

    pub max_iterations: u32,

    /// Papers in the store at the last progress update
    pub papers_collected: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a freshly-submitted job in the running state
    pub fn new(session_id: Uuid, max_iterations: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            status: JobStatus::Running,
            current_iteration: 0,
            max_iterations,
            papers_collected: 0,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    /// Iteration progress as a percentage
    pub fn progress_percent(&self) -> f64 {
        if self.max_iterations == 0 {
            0.0
        } else {
            (self.current_iteration as f64 / self.max_iterations as f64) * 100.0
        }
    }
}

//! Job orchestrator
//!
//! Accepts crawl submissions, runs crawl loops on a bounded worker pool,
//! and tracks per-job state. Submission never blocks on crawl execution:
//! the caller gets a job id immediately and polls status. Job state lives
//! behind one mutex-guarded map with short critical sections; readers get
//! snapshots, never references. A crawl failure (including a panic) marks
//! its own job failed and touches nothing else.

use crate::coordinator::{CrawlArtifacts, CrawlCoordinator, ProgressFn};
use crate::provider::{create_provider, MetadataProvider};
use crate::topics::TopicAssigner;
use chrono::Utc;
use citewalk_common::config::{CrawlRunInputs, CrawlerConfig};
use citewalk_common::errors::{AppError, Result};
use citewalk_common::metrics as crawl_metrics;
use citewalk_common::models::{Job, JobStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{error, info};
use uuid::Uuid;

/// Mutex-guarded job table. All reads are snapshots.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.id, job);
    }

    /// Snapshot of one job
    pub fn snapshot(&self, job_id: Uuid) -> Option<Job> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.get(&job_id).cloned()
    }

    /// Apply a mutation to one job under the lock
    pub fn update<F: FnOnce(&mut Job)>(&self, job_id: Uuid, mutate: F) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = jobs.get_mut(&job_id) {
            mutate(job);
        }
    }

    pub fn len(&self) -> usize {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Schedules and tracks crawl jobs
pub struct JobOrchestrator {
    registry: Arc<JobRegistry>,
    artifacts: Arc<Mutex<HashMap<Uuid, Arc<CrawlArtifacts>>>>,
    permits: Arc<Semaphore>,
    config: CrawlerConfig,
    provider_override: Option<Arc<dyn MetadataProvider>>,
    topic_assigner: Option<Arc<dyn TopicAssigner>>,
    accepting: AtomicBool,
}

impl JobOrchestrator {
    /// Build an orchestrator with `worker_count` concurrent crawl slots;
    /// submissions beyond capacity queue
    pub fn new(config: CrawlerConfig) -> Self {
        let workers = config.worker_count.max(1);
        Self {
            registry: Arc::new(JobRegistry::new()),
            artifacts: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(workers)),
            config,
            provider_override: None,
            topic_assigner: None,
            accepting: AtomicBool::new(true),
        }
    }

    /// Route every run through a fixed provider instead of the factory
    /// (fixtures, tests)
    pub fn with_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.provider_override = Some(provider);
        self
    }

    pub fn with_topic_assigner(mut self, assigner: Arc<dyn TopicAssigner>) -> Self {
        self.topic_assigner = Some(assigner);
        self
    }

    /// Register a crawl job and hand it to the worker pool.
    ///
    /// Returns as soon as job state is registered. Configuration problems
    /// (bad limits, bad keyword syntax, unknown provider tag) fail here and
    /// no job is created.
    pub fn submit(&self, session_id: Uuid, inputs: CrawlRunInputs) -> Result<Uuid> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(AppError::ShuttingDown);
        }

        inputs.validate()?;

        let provider = match &self.provider_override {
            Some(provider) => provider.clone(),
            None => create_provider(&inputs.provider, &self.config)?,
        };

        let mut coordinator = CrawlCoordinator::new(provider, inputs.clone())?;
        if let Some(assigner) = &self.topic_assigner {
            coordinator = coordinator.with_topic_assigner(assigner.clone());
        }

        let job = Job::new(session_id, inputs.stopping.max_iterations);
        let job_id = job.id;
        self.registry.insert(job);
        crawl_metrics::record_job_submitted();
        info!(job_id = %job_id, session_id = %session_id, "Crawl job submitted");

        let registry = self.registry.clone();
        let artifacts = self.artifacts.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    finish_failed(&registry, job_id, "worker pool closed".into());
                    return;
                }
            };

            registry.update(job_id, |job| job.started_at = Some(Utc::now()));

            let progress_registry = registry.clone();
            let progress: ProgressFn = Box::new(move |iteration, papers| {
                progress_registry.update(job_id, |job| {
                    job.current_iteration = iteration;
                    job.papers_collected = papers;
                });
            });

            // Run on its own task so a panic is contained and surfaces as a
            // join error instead of taking the worker down
            let outcome = tokio::spawn(coordinator.run(progress)).await;

            match outcome {
                Ok(Ok(result)) => {
                    let papers = result.store.len();
                    {
                        let mut table =
                            artifacts.lock().unwrap_or_else(|e| e.into_inner());
                        table.insert(job_id, Arc::new(result));
                    }
                    registry.update(job_id, |job| {
                        job.status = JobStatus::Completed;
                        job.papers_collected = papers;
                        job.completed_at = Some(Utc::now());
                    });
                    crawl_metrics::record_job_finished("completed");
                    info!(job_id = %job_id, papers, "Crawl job completed");
                }
                Ok(Err(e)) => {
                    finish_failed(&registry, job_id, e.to_string());
                }
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        "crawl worker panicked".to_string()
                    } else {
                        join_error.to_string()
                    };
                    finish_failed(&registry, job_id, message);
                }
            }
        });

        Ok(job_id)
    }

    /// Snapshot of one job's state
    pub fn status(&self, job_id: Uuid) -> Option<Job> {
        self.registry.snapshot(job_id)
    }

    /// Artifacts of a completed job. Running and failed jobs have none.
    pub fn artifacts(&self, job_id: Uuid) -> Result<Arc<CrawlArtifacts>> {
        let job = self
            .registry
            .snapshot(job_id)
            .ok_or_else(|| AppError::JobNotFound {
                id: job_id.to_string(),
            })?;
        if job.status != JobStatus::Completed {
            return Err(AppError::JobNotCompleted {
                id: job_id.to_string(),
            });
        }
        let table = self.artifacts.lock().unwrap_or_else(|e| e.into_inner());
        table
            .get(&job_id)
            .cloned()
            .ok_or_else(|| AppError::Internal {
                message: format!("artifacts missing for completed job {}", job_id),
            })
    }

    /// Stop accepting submissions. In-flight jobs run on best-effort and
    /// are not awaited.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        info!("Orchestrator no longer accepting submissions");
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

fn finish_failed(registry: &JobRegistry, job_id: Uuid, message: String) {
    error!(job_id = %job_id, error = %message, "Crawl job failed");
    registry.update(job_id, |job| {
        job.status = JobStatus::Failed;
        job.error_message = Some(message);
        job.completed_at = Some(Utc::now());
    });
    crawl_metrics::record_job_finished("failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{FetchOutcome, StaticProvider};
    use async_trait::async_trait;
    use citewalk_common::config::{ServiceConfig, StoppingConfig};
    use citewalk_common::models::PaperObject;
    use std::time::Duration;

    fn crawler_config() -> CrawlerConfig {
        ServiceConfig::default().crawler
    }

    fn paper(id: &str, references: &[&str]) -> PaperObject {
        PaperObject {
            id: id.into(),
            title: format!("Paper {}", id),
            year: Some(2020),
            referenced_ids: references.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn inputs(seeds: &[&str], max_iterations: u32) -> CrawlRunInputs {
        CrawlRunInputs {
            seed_paper_ids: seeds.iter().map(|s| s.to_string()).collect(),
            stopping: StoppingConfig {
                max_iterations,
                max_store_size: 100,
            },
            ..Default::default()
        }
    }

    async fn wait_terminal(orchestrator: &JobOrchestrator, job_id: Uuid) -> Job {
        for _ in 0..500 {
            if let Some(job) = orchestrator.status(job_id) {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    /// Provider whose every call is a total loss
    struct DeadProvider;

    #[async_trait]
    impl MetadataProvider for DeadProvider {
        async fn fetch_many(&self, _ids: &[String]) -> citewalk_common::errors::Result<FetchOutcome> {
            Err(AppError::ProviderUnavailable {
                message: "connection refused".into(),
            })
        }

        async fn fetch_author_works(
            &self,
            _author_id: &str,
        ) -> citewalk_common::errors::Result<(Vec<PaperObject>, usize)> {
            Err(AppError::ProviderUnavailable {
                message: "connection refused".into(),
            })
        }

        fn failed_ids(&self) -> Vec<String> {
            Vec::new()
        }

        fn name(&self) -> &str {
            "dead"
        }
    }

    #[tokio::test]
    async fn test_submit_returns_immediately_and_completes() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", &["W2"]))
                .with_paper(paper("W2", &[])),
        );
        let orchestrator = JobOrchestrator::new(crawler_config()).with_provider(provider);

        let job_id = orchestrator
            .submit(Uuid::new_v4(), inputs(&["W1", "W2"], 1))
            .unwrap();

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.papers_collected, 2);
        assert!(job.completed_at.is_some());

        let artifacts = orchestrator.artifacts(job_id).unwrap();
        assert_eq!(artifacts.graph.node_count(), 2);
        assert_eq!(artifacts.graph.edge_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_creates_no_job() {
        let orchestrator = JobOrchestrator::new(crawler_config());
        let bad = inputs(&["W1"], 0); // max_iterations < 1

        assert!(orchestrator.submit(Uuid::new_v4(), bad).is_err());
        assert!(orchestrator.registry.is_empty());
    }

    #[tokio::test]
    async fn test_bad_keyword_syntax_creates_no_job() {
        let orchestrator = JobOrchestrator::new(crawler_config());
        let mut bad = inputs(&["W1"], 1);
        bad.keywords = vec!["(unbalanced".into()];

        assert!(orchestrator.submit(Uuid::new_v4(), bad).is_err());
        assert!(orchestrator.registry.is_empty());
    }

    #[tokio::test]
    async fn test_provider_loss_fails_job_without_escaping() {
        let orchestrator =
            JobOrchestrator::new(crawler_config()).with_provider(Arc::new(DeadProvider));

        let job_id = orchestrator
            .submit(Uuid::new_v4(), inputs(&["W1"], 1))
            .unwrap();

        let job = wait_terminal(&orchestrator, job_id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert!(orchestrator.artifacts(job_id).is_err());
    }

    #[tokio::test]
    async fn test_failed_job_does_not_affect_others() {
        let good = Arc::new(StaticProvider::new().with_paper(paper("W1", &[])));
        let orchestrator = JobOrchestrator::new(crawler_config()).with_provider(good);
        let good_id = orchestrator
            .submit(Uuid::new_v4(), inputs(&["W1"], 1))
            .unwrap();

        let failing =
            JobOrchestrator::new(crawler_config()).with_provider(Arc::new(DeadProvider));
        let bad_id = failing.submit(Uuid::new_v4(), inputs(&["W9"], 1)).unwrap();

        let good_job = wait_terminal(&orchestrator, good_id).await;
        let bad_job = wait_terminal(&failing, bad_id).await;
        assert_eq!(good_job.status, JobStatus::Completed);
        assert_eq!(bad_job.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_artifacts_for_unknown_and_running_jobs() {
        let orchestrator = JobOrchestrator::new(crawler_config());
        assert!(matches!(
            orchestrator.artifacts(Uuid::new_v4()),
            Err(AppError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_submissions() {
        let provider = Arc::new(StaticProvider::new().with_paper(paper("W1", &[])));
        let orchestrator = JobOrchestrator::new(crawler_config()).with_provider(provider);

        orchestrator.shutdown();
        assert!(!orchestrator.is_accepting());
        assert!(matches!(
            orchestrator.submit(Uuid::new_v4(), inputs(&["W1"], 1)),
            Err(AppError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_jobs_are_isolated() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", &["W2"]))
                .with_paper(paper("W2", &[]))
                .with_paper(paper("W3", &[])),
        );
        let orchestrator = JobOrchestrator::new(crawler_config()).with_provider(provider);

        let first = orchestrator
            .submit(Uuid::new_v4(), inputs(&["W1"], 2))
            .unwrap();
        let second = orchestrator
            .submit(Uuid::new_v4(), inputs(&["W3"], 1))
            .unwrap();

        let first_job = wait_terminal(&orchestrator, first).await;
        let second_job = wait_terminal(&orchestrator, second).await;

        assert_eq!(first_job.status, JobStatus::Completed);
        assert_eq!(second_job.status, JobStatus::Completed);

        // Each job's artifacts reflect only its own crawl
        let first_artifacts = orchestrator.artifacts(first).unwrap();
        let second_artifacts = orchestrator.artifacts(second).unwrap();
        assert!(first_artifacts.store.contains("W1"));
        assert!(!second_artifacts.store.contains("W1"));
        assert!(second_artifacts.store.contains("W3"));
    }
}

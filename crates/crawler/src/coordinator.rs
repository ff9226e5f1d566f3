//! Crawl loop coordinator
//!
//! Runs one crawl job end to end: retrieve a batch, validate and ingest it,
//! update the graph and its centrality scores, sample the next batch, and
//! consult the stopping policy. Per-paper failures never abort the run;
//! they are absorbed into the run report. Only total provider loss and
//! unexpected failures escape to the orchestrator boundary.

use crate::centrality::CentralityComputer;
use crate::graph::CitationNetwork;
use crate::provider::MetadataProvider;
use crate::sampler::Sampler;
use crate::stopping::{should_stop, StopReason};
use crate::store::{PaperStore, REASON_FETCH_FAILED, REASON_RETRACTED};
use crate::topics::{TopicAssignment, TopicAssigner};
use citewalk_common::config::CrawlRunInputs;
use citewalk_common::errors::Result;
use citewalk_common::metrics as crawl_metrics;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Aggregated counters and warnings for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    pub iterations: u32,
    pub papers_fetched: usize,
    pub fetch_failures: usize,
    pub validation_drops: usize,

    /// Human-readable consistency warnings (requested-but-absent ids,
    /// unrequested returns)
    pub inconsistencies: Vec<String>,

    pub stop_reason: Option<StopReason>,
}

/// Final artifacts of a completed run
pub struct CrawlArtifacts {
    pub store: PaperStore,
    pub graph: CitationNetwork,
    pub report: CrawlReport,
    pub topics: Option<TopicAssignment>,
}

/// Per-iteration progress callback: (completed iterations, store size)
pub type ProgressFn = Box<dyn FnMut(u32, usize) + Send>;

/// One crawl run's working state
pub struct CrawlCoordinator {
    provider: Arc<dyn MetadataProvider>,
    inputs: CrawlRunInputs,
    sampler: Sampler,
    store: PaperStore,
    graph: CitationNetwork,
    centrality: CentralityComputer,
    topic_assigner: Option<Arc<dyn TopicAssigner>>,
    report: CrawlReport,
    rng: StdRng,
}

impl CrawlCoordinator {
    /// Build a coordinator. Keyword parse failures surface here, before
    /// any job state exists.
    pub fn new(provider: Arc<dyn MetadataProvider>, inputs: CrawlRunInputs) -> Result<Self> {
        let sampler = Sampler::new(inputs.sampling.clone(), &inputs.keywords)?;
        let centrality = CentralityComputer::new(&inputs.graph);
        Ok(Self {
            provider,
            inputs,
            sampler,
            store: PaperStore::new(),
            graph: CitationNetwork::new(),
            centrality,
            topic_assigner: None,
            report: CrawlReport::default(),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_topic_assigner(mut self, assigner: Arc<dyn TopicAssigner>) -> Self {
        self.topic_assigner = Some(assigner);
        self
    }

    /// Fix the sampling seed, for reproducible runs
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Execute the crawl loop to completion.
    ///
    /// `progress` is called after each iteration with the completed
    /// iteration count and current store size.
    #[instrument(skip_all, fields(provider = self.provider.name()))]
    pub async fn run(mut self, mut progress: ProgressFn) -> Result<CrawlArtifacts> {
        let mut batch = self.initial_batch().await?;
        let mut iteration: u32 = 0;

        info!(
            seeds = batch.len(),
            max_iterations = self.inputs.stopping.max_iterations,
            "Crawl started"
        );

        loop {
            if let Some(reason) = should_stop(iteration, self.store.len(), &self.inputs.stopping) {
                self.report.stop_reason = Some(reason);
                break;
            }
            if batch.is_empty() {
                self.report.stop_reason = Some(StopReason::FrontierExhausted);
                break;
            }

            // Batch members are committed: never re-drawn, even if they fail
            self.store.mark_selected(&batch);
            self.store.forbid(&batch, self.sampler.reason());

            self.retrieve_and_ingest(&batch).await?;

            self.graph.update_from_store(&self.store, &self.inputs.graph);
            if self.graph.centrality_stale() {
                self.centrality.compute(&mut self.graph);
            }

            iteration += 1;
            self.report.iterations = iteration;
            crawl_metrics::record_iteration();
            progress(iteration, self.store.len());
            debug!(
                iteration,
                papers = self.store.len(),
                nodes = self.graph.node_count(),
                "Iteration finished"
            );

            if let Some(reason) = should_stop(iteration, self.store.len(), &self.inputs.stopping) {
                self.report.stop_reason = Some(reason);
                break;
            }

            batch = self.sampler.draw(
                &self.store,
                &self.graph,
                self.inputs.retraction.avoid_retracted,
                &mut self.rng,
            );
            if batch.is_empty() {
                self.report.stop_reason = Some(StopReason::FrontierExhausted);
                break;
            }
        }

        info!(
            iterations = self.report.iterations,
            papers = self.store.len(),
            stop_reason = ?self.report.stop_reason,
            "Crawl finished"
        );

        let topics = self.assign_topics();

        Ok(CrawlArtifacts {
            store: self.store,
            graph: self.graph,
            report: self.report,
            topics,
        })
    }

    /// Seed papers, plus the works of any seed authors, form the first
    /// batch to retrieve
    async fn initial_batch(&mut self) -> Result<Vec<String>> {
        let mut batch = self.inputs.seed_paper_ids.clone();

        for author_id in self.inputs.seed_author_ids.clone() {
            let (works, total) = self.provider.fetch_author_works(&author_id).await?;
            debug!(author_id = %author_id, works = works.len(), total, "Seed author expanded");
            for work in works {
                if !batch.contains(&work.id) {
                    batch.push(work.id);
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        batch.retain(|id| !id.trim().is_empty() && seen.insert(id.clone()));
        Ok(batch)
    }

    /// One Retrieving + Ingesting pass over a batch
    async fn retrieve_and_ingest(&mut self, batch: &[String]) -> Result<()> {
        let outcome = self.provider.fetch_many(batch).await?;
        crawl_metrics::record_fetch_batch(
            self.provider.name(),
            outcome.papers.len(),
            outcome.failed.len(),
        );

        if !outcome.failed.is_empty() {
            warn!(
                failed = outcome.failed.len(),
                "Some ids could not be retrieved; continuing with partial batch"
            );
            self.report.fetch_failures += outcome.failed.len();
            self.store.forbid(&outcome.failed, REASON_FETCH_FAILED);
        }

        let mut drops = 0usize;
        for paper in &outcome.papers {
            if !batch.contains(&paper.id) {
                let message = format!("provider returned unrequested id {}", paper.id);
                warn!(paper_id = %paper.id, "Unrequested id in response");
                self.report.inconsistencies.push(message);
            }

            if !paper.is_valid(self.inputs.require_abstract) {
                debug!(paper_id = %paper.id, "Dropping invalid paper before ingestion");
                drops += 1;
                continue;
            }

            self.store.upsert(paper);
            if paper.is_retracted {
                self.store
                    .forbid(std::slice::from_ref(&paper.id), REASON_RETRACTED);
            }
        }
        let ingested = outcome.papers.len() - drops;
        self.report.papers_fetched += ingested;
        self.report.validation_drops += drops;
        crawl_metrics::record_papers_ingested(ingested);
        crawl_metrics::record_validation_drops(drops);

        // Seed flags only stick for rows that actually exist now
        self.store.mark_seed(&self.inputs.seed_paper_ids);

        self.check_consistency(batch, &outcome.failed);
        Ok(())
    }

    /// Every requested id must now be processed in the store, unless the
    /// adapter reported it failed. Anything else is an inconsistency:
    /// logged, counted, and the run proceeds with partial data.
    fn check_consistency(&mut self, requested: &[String], failed: &[String]) {
        let mut warnings = 0usize;
        for id in requested {
            if failed.contains(id) {
                continue;
            }
            let processed = self.store.get(id).map(|p| p.processed).unwrap_or(false);
            if !processed {
                let message = format!("requested id {} absent from provider response", id);
                warn!(paper_id = %id, "Requested id missing after ingestion");
                self.report.inconsistencies.push(message);
                warnings += 1;
            }
        }
        crawl_metrics::record_consistency_warnings(warnings);
    }

    fn assign_topics(&self) -> Option<TopicAssignment> {
        let assigner = self.topic_assigner.as_ref()?;
        match assigner.assign_topics(&self.store, &self.inputs.topic_model, self.inputs.num_topics)
        {
            Ok(assignment) => Some(assignment),
            Err(e) => {
                // Topic modelling is best-effort; a failure never fails the run
                warn!(error = %e, "Topic assignment failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticProvider;
    use citewalk_common::config::{SamplingConfig, StoppingConfig};
    use citewalk_common::models::PaperObject;

    fn paper(id: &str, title: &str, references: &[&str]) -> PaperObject {
        PaperObject {
            id: id.into(),
            title: title.into(),
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
            sampling: SamplingConfig {
                papers_per_iteration: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn no_progress() -> ProgressFn {
        Box::new(|_, _| {})
    }

    #[tokio::test]
    async fn test_single_iteration_builds_store_and_graph() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "Seed one", &["W2"]))
                .with_paper(paper("W2", "Seed two", &[])),
        );
        let coordinator =
            CrawlCoordinator::new(provider, inputs(&["W1", "W2"], 1)).unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();

        assert_eq!(artifacts.store.len(), 2);
        assert_eq!(artifacts.graph.node_count(), 2);
        assert_eq!(artifacts.graph.edge_count(), 1);
        assert_eq!(artifacts.report.iterations, 1);
        assert_eq!(artifacts.report.stop_reason, Some(StopReason::MaxIterations));
        // Centrality computed without error
        let scores = artifacts
            .graph
            .paper_centralities(&["W1".to_string(), "W2".to_string()]);
        assert!(scores["W2"].0.is_finite());
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_run() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "Good seed", &[]))
                .with_failure("W2"),
        );
        let coordinator = CrawlCoordinator::new(
            provider.clone(),
            inputs(&["W1", "W2"], 1),
        )
        .unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();

        assert_eq!(artifacts.store.len(), 1);
        assert!(artifacts.store.get("W2").is_none());
        assert_eq!(artifacts.report.fetch_failures, 1);
        assert_eq!(provider.failed_ids(), vec!["W2".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_frontier_finalizes_early() {
        // One seed with no references: after iteration 1 the pool is empty
        let provider =
            Arc::new(StaticProvider::new().with_paper(paper("W1", "Lonely seed", &[])));
        let coordinator = CrawlCoordinator::new(provider, inputs(&["W1"], 10)).unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();

        assert_eq!(
            artifacts.report.stop_reason,
            Some(StopReason::FrontierExhausted)
        );
        assert!(artifacts.report.iterations < 10);
    }

    #[tokio::test]
    async fn test_iterations_never_exceed_max() {
        // Chain of references keeps the frontier alive indefinitely
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "One", &["W2"]))
                .with_paper(paper("W2", "Two", &["W3"]))
                .with_paper(paper("W3", "Three", &["W4"]))
                .with_paper(paper("W4", "Four", &["W5"]))
                .with_paper(paper("W5", "Five", &["W6"])),
        );
        let run_inputs = inputs(&["W1"], 3);
        let max = run_inputs.stopping.max_iterations;
        let coordinator = CrawlCoordinator::new(provider, run_inputs).unwrap();

        let mut seen_max = 0u32;
        let artifacts = coordinator
            .run(Box::new(move |iteration, _| {
                seen_max = seen_max.max(iteration);
                assert!(iteration <= 3);
            }))
            .await
            .unwrap();

        assert!(artifacts.report.iterations <= max);
        assert_eq!(artifacts.report.stop_reason, Some(StopReason::MaxIterations));
    }

    #[tokio::test]
    async fn test_store_size_limit_stops_run() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "One", &["W2", "W3", "W4"]))
                .with_paper(paper("W2", "Two", &[])),
        );
        let mut run_inputs = inputs(&["W1"], 10);
        run_inputs.stopping.max_store_size = 2;
        let coordinator = CrawlCoordinator::new(provider, run_inputs).unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();
        assert_eq!(artifacts.report.stop_reason, Some(StopReason::StoreSize));
    }

    #[tokio::test]
    async fn test_validation_drops_counted() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "Valid", &[]))
                // Empty title fails validation
                .with_paper(paper("W2", "", &[])),
        );
        let coordinator =
            CrawlCoordinator::new(provider, inputs(&["W1", "W2"], 1)).unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();
        assert_eq!(artifacts.store.len(), 1);
        assert_eq!(artifacts.report.validation_drops, 1);
        // Only the ingested paper counts as fetched; the drop is not double-counted
        assert_eq!(artifacts.report.papers_fetched, 1);
        // The dropped paper shows up as an inconsistency, not a crash
        assert!(!artifacts.report.inconsistencies.is_empty());
    }

    #[tokio::test]
    async fn test_sampled_ids_never_resampled() {
        let provider = Arc::new(
            StaticProvider::new()
                .with_paper(paper("W1", "One", &["W2"]))
                .with_paper(paper("W2", "Two", &["W1"])),
        );
        let coordinator = CrawlCoordinator::new(provider, inputs(&["W1"], 10)).unwrap();

        let artifacts = coordinator.run(no_progress()).await.unwrap();
        // W1 and W2 each retrieved exactly once, then the pool dries up
        assert_eq!(
            artifacts.report.stop_reason,
            Some(StopReason::FrontierExhausted)
        );
        assert!(artifacts
            .store
            .is_forbidden("W1", crate::sampler::SAMPLER_REASON));
        assert!(artifacts
            .store
            .is_forbidden("W2", crate::sampler::SAMPLER_REASON));
    }

    #[tokio::test]
    async fn test_seed_author_expansion() {
        use citewalk_common::models::AuthorRef;
        let mut authored = paper("W1", "Authored work", &[]);
        authored.authors = vec![AuthorRef {
            id: "A1".into(),
            name: "Ada".into(),
        }];
        let provider = Arc::new(StaticProvider::new().with_paper(authored));

        let run_inputs = CrawlRunInputs {
            seed_author_ids: vec!["A1".into()],
            stopping: StoppingConfig {
                max_iterations: 1,
                max_store_size: 100,
            },
            ..Default::default()
        };
        let coordinator = CrawlCoordinator::new(provider, run_inputs).unwrap();
        let artifacts = coordinator.run(no_progress()).await.unwrap();

        assert_eq!(artifacts.store.len(), 1);
        assert!(artifacts.store.get("W1").unwrap().processed);
    }
}

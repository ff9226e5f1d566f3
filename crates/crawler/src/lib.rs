//! Citation-network crawler
//!
//! Core crawl engine: job orchestration over a bounded worker pool, the
//! retrieve/validate/ingest/graph-update/sample loop, the in-memory paper
//! store, the citation network with eigenvector centrality, the weighted
//! sampler, and the result assembler consumed by the HTTP surface.

pub mod assemble;
pub mod centrality;
pub mod coordinator;
pub mod graph;
pub mod keywords;
pub mod orchestrator;
pub mod provider;
pub mod sampler;
pub mod stopping;
pub mod store;
pub mod topics;

pub use assemble::{Page, PaperQuery, PaperSummary, ResultAssembler};
pub use coordinator::{CrawlArtifacts, CrawlCoordinator, CrawlReport};
pub use graph::CitationNetwork;
pub use orchestrator::{JobOrchestrator, JobRegistry};
pub use provider::{create_provider, FetchOutcome, MetadataProvider, StaticProvider};
pub use store::PaperStore;
pub use topics::{TopicAssigner, TopicAssignment, TopicCluster};

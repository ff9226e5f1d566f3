//! Metadata provider adapters
//!
//! Wraps remote bibliographic APIs behind the `MetadataProvider` trait.
//! Per-id failures are data, not errors: `fetch_many` returns the papers it
//! could resolve plus the ids it could not, and adapters keep a cumulative
//! failed-id list queryable after the fact. Only total loss of the provider
//! (nothing resolvable for a whole call) is an `Err`.

mod fixture;
mod openalex;

pub use fixture::StaticProvider;
pub use openalex::OpenAlexProvider;

use async_trait::async_trait;
use citewalk_common::config::CrawlerConfig;
use citewalk_common::errors::{AppError, Result};
use citewalk_common::models::PaperObject;
use std::sync::Arc;

/// Outcome of one batched retrieval
#[derive(Debug, Default, Clone)]
pub struct FetchOutcome {
    /// Successfully fetched papers
    pub papers: Vec<PaperObject>,

    /// Requested ids that could not be resolved in this call
    pub failed: Vec<String>,
}

/// A bibliographic metadata source
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch a batch of papers by provider-native id. Unresolvable ids are
    /// reported in the outcome, never raised.
    async fn fetch_many(&self, ids: &[String]) -> Result<FetchOutcome>;

    /// Fetch all works by an author, plus the provider's total count
    async fn fetch_author_works(&self, author_id: &str) -> Result<(Vec<PaperObject>, usize)>;

    /// All ids that failed across the lifetime of this adapter
    fn failed_ids(&self) -> Vec<String>;

    /// Short tag naming the source
    fn name(&self) -> &str;
}

/// Build a provider from its string tag
pub fn create_provider(tag: &str, config: &CrawlerConfig) -> Result<Arc<dyn MetadataProvider>> {
    match tag {
        "openalex" => Ok(Arc::new(OpenAlexProvider::new(config)?)),
        other => Err(AppError::Configuration {
            message: format!("unknown metadata provider: {:?}", other),
        }),
    }
}

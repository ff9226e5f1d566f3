//! Configuration for citewalk
//!
//! Two layers of configuration live here:
//! - `ServiceConfig`: process-level settings loaded from files and
//!   environment variables (prefixed with APP__)
//! - `CrawlRunInputs` and its per-concern sub-configs: an immutable snapshot
//!   captured at job submission and validated before any work starts
//!
//! Run inputs are flat structs, one per concern (sampling, stopping, graph,
//! retraction). Invalid values are a submission-time error, never a mid-run
//! failure.

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Sampling hyperparameters for one crawl run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Batch size drawn per iteration
    #[serde(default = "default_papers_per_iteration")]
    pub papers_per_iteration: usize,

    /// Weight applied to the summed in/out centrality term
    #[serde(default = "default_centrality_weight")]
    pub centrality_weight: f64,

    /// Weight applied to the recency term
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// Exponential decay per year of age for the recency term
    #[serde(default = "default_recency_decay")]
    pub recency_decay: f64,

    /// Multiplier applied to candidates matching no keyword filter.
    /// 0.0 hard-gates non-matching candidates; any other value soft-biases.
    #[serde(default = "default_no_keyword_lambda")]
    pub no_keyword_lambda: f64,
}

impl SamplingConfig {
    /// Validate sampling parameters at job submission
    pub fn validate(&self) -> Result<()> {
        if self.papers_per_iteration == 0 {
            return Err(AppError::Configuration {
                message: "papers_per_iteration must be >= 1".into(),
            });
        }
        for (name, value) in [
            ("centrality_weight", self.centrality_weight),
            ("recency_weight", self.recency_weight),
            ("recency_decay", self.recency_decay),
            ("no_keyword_lambda", self.no_keyword_lambda),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::Configuration {
                    message: format!("{} must be finite and non-negative, got {}", name, value),
                });
            }
        }
        if self.no_keyword_lambda > 1.0 {
            return Err(AppError::Configuration {
                message: format!(
                    "no_keyword_lambda must be in [0, 1], got {}",
                    self.no_keyword_lambda
                ),
            });
        }
        Ok(())
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            papers_per_iteration: default_papers_per_iteration(),
            centrality_weight: default_centrality_weight(),
            recency_weight: default_recency_weight(),
            recency_decay: default_recency_decay(),
            no_keyword_lambda: default_no_keyword_lambda(),
        }
    }
}

/// Stopping limits for one crawl run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoppingConfig {
    /// Maximum number of crawl iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Maximum number of papers in the store before the run stops
    #[serde(default = "default_max_store_size")]
    pub max_store_size: usize,
}

impl StoppingConfig {
    /// Validate stopping parameters at job submission
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(AppError::Configuration {
                message: "max_iterations must be >= 1".into(),
            });
        }
        if self.max_store_size == 0 {
            return Err(AppError::Configuration {
                message: "max_store_size must be > 0".into(),
            });
        }
        Ok(())
    }
}

impl Default for StoppingConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_store_size: default_max_store_size(),
        }
    }
}

/// Graph construction options for one crawl run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphConfig {
    /// Add author nodes and paper-author edges
    #[serde(default)]
    pub include_authors: bool,

    /// Add venue nodes and paper-venue edges
    #[serde(default)]
    pub include_venues: bool,

    /// Venues never added as nodes (preprint servers etc.)
    #[serde(default)]
    pub venue_ignore_list: Vec<String>,

    /// Power-iteration cap for centrality
    #[serde(default = "default_centrality_max_iterations")]
    pub centrality_max_iterations: usize,

    /// Convergence threshold for centrality
    #[serde(default = "default_centrality_epsilon")]
    pub centrality_epsilon: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            include_authors: false,
            include_venues: false,
            venue_ignore_list: Vec::new(),
            centrality_max_iterations: default_centrality_max_iterations(),
            centrality_epsilon: default_centrality_epsilon(),
        }
    }
}

/// Retraction handling for one crawl run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetractionConfig {
    /// Skip retracted papers during sampling
    #[serde(default = "default_avoid_retracted")]
    pub avoid_retracted: bool,
}

impl Default for RetractionConfig {
    fn default() -> Self {
        Self {
            avoid_retracted: default_avoid_retracted(),
        }
    }
}

/// Immutable snapshot of everything a crawl run needs, captured at submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlRunInputs {
    /// Seed paper ids (provider-native)
    #[serde(default)]
    pub seed_paper_ids: Vec<String>,

    /// Seed author ids; all of their works join the first batch
    #[serde(default)]
    pub seed_author_ids: Vec<String>,

    /// Keyword filter expressions (AND/OR/NOT, parenthesized)
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Drop fetched papers without an abstract
    #[serde(default)]
    pub require_abstract: bool,

    /// Provider tag selecting the metadata source
    #[serde(default = "default_provider_tag")]
    pub provider: String,

    /// Topic model applied to the finished store ("nmf", "lda")
    #[serde(default = "default_topic_model")]
    pub topic_model: String,

    /// Number of topic clusters
    #[serde(default = "default_num_topics")]
    pub num_topics: usize,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub stopping: StoppingConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub retraction: RetractionConfig,
}

impl CrawlRunInputs {
    /// Validate all run inputs. Called once at submission; a failure here
    /// means the job is never created.
    pub fn validate(&self) -> Result<()> {
        if self.seed_paper_ids.is_empty() && self.seed_author_ids.is_empty() {
            return Err(AppError::Configuration {
                message: "at least one seed paper or seed author id is required".into(),
            });
        }
        if self.seed_paper_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(AppError::Configuration {
                message: "seed paper ids must be non-empty strings".into(),
            });
        }
        self.sampling.validate()?;
        self.stopping.validate()?;
        Ok(())
    }
}

impl Default for CrawlRunInputs {
    fn default() -> Self {
        Self {
            seed_paper_ids: Vec::new(),
            seed_author_ids: Vec::new(),
            keywords: Vec::new(),
            require_abstract: false,
            provider: default_provider_tag(),
            topic_model: default_topic_model(),
            num_topics: default_num_topics(),
            sampling: SamplingConfig::default(),
            stopping: StoppingConfig::default(),
            graph: GraphConfig::default(),
            retraction: RetractionConfig::default(),
        }
    }
}

/// Process-level service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub crawler: CrawlerConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Concurrent crawl runs; submissions beyond this queue
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Base URL for the OpenAlex provider
    #[serde(default = "default_openalex_base")]
    pub openalex_base_url: String,

    /// Contact email forwarded to the provider (polite pool)
    pub mailto: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_papers_per_iteration() -> usize { 10 }
fn default_centrality_weight() -> f64 { 1.0 }
fn default_recency_weight() -> f64 { 1.0 }
fn default_recency_decay() -> f64 { 0.1 }
fn default_no_keyword_lambda() -> f64 { 0.2 }
fn default_max_iterations() -> u32 { 5 }
fn default_max_store_size() -> usize { 500 }
fn default_centrality_max_iterations() -> usize { 100 }
fn default_centrality_epsilon() -> f64 { 1e-6 }
fn default_avoid_retracted() -> bool { true }
fn default_provider_tag() -> String { crate::DEFAULT_PROVIDER.to_string() }
fn default_topic_model() -> String { "nmf".to_string() }
fn default_num_topics() -> usize { 10 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_worker_count() -> usize { 2 }
fn default_openalex_base() -> String { "https://api.openalex.org".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_metrics_port() -> u16 { 9090 }

impl ServiceConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            crawler: CrawlerConfig {
                worker_count: default_worker_count(),
                openalex_base_url: default_openalex_base(),
                mailto: None,
                request_timeout_secs: default_request_timeout(),
            },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: false,
                metrics_port: default_metrics_port(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_inputs_need_seeds() {
        let inputs = CrawlRunInputs::default();
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn test_valid_run_inputs() {
        let inputs = CrawlRunInputs {
            seed_paper_ids: vec!["W1".into()],
            ..Default::default()
        };
        assert!(inputs.validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let inputs = CrawlRunInputs {
            seed_paper_ids: vec!["W1".into()],
            stopping: StoppingConfig {
                max_iterations: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn test_lambda_out_of_range_rejected() {
        let inputs = CrawlRunInputs {
            seed_paper_ids: vec!["W1".into()],
            sampling: SamplingConfig {
                no_keyword_lambda: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(inputs.validate().is_err());
    }

    #[test]
    fn test_zero_lambda_is_valid() {
        // 0.0 is the hard-gate boundary and must be accepted
        let cfg = SamplingConfig {
            no_keyword_lambda: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_default_service_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.crawler.worker_count, 2);
    }
}

//! Citewalk Common Library
//!
//! Shared code for the citewalk crawler and gateway including:
//! - Error types and handling
//! - Run and service configuration
//! - Domain models (papers, jobs)
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::{CrawlRunInputs, ServiceConfig};
pub use errors::{AppError, Result};
pub use models::{Job, JobStatus, PaperObject, PaperRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default provider tag used when a submission does not name one
pub const DEFAULT_PROVIDER: &str = "openalex";

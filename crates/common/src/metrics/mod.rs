//! Metrics and observability utilities
//!
//! Prometheus metric descriptions and recording helpers for crawl events.
//! Per-paper failures never raise errors; they land here as counters.

use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};

/// Metrics prefix for all citewalk metrics
pub const METRICS_PREFIX: &str = "citewalk";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_jobs_submitted_total", METRICS_PREFIX),
        Unit::Count,
        "Total crawl jobs submitted"
    );

    describe_counter!(
        format!("{}_jobs_finished_total", METRICS_PREFIX),
        Unit::Count,
        "Total crawl jobs reaching a terminal state, by status"
    );

    describe_gauge!(
        format!("{}_jobs_active", METRICS_PREFIX),
        Unit::Count,
        "Crawl jobs currently running"
    );

    describe_counter!(
        format!("{}_iterations_total", METRICS_PREFIX),
        Unit::Count,
        "Total crawl iterations executed"
    );

    describe_counter!(
        format!("{}_papers_fetched_total", METRICS_PREFIX),
        Unit::Count,
        "Papers returned by providers, before validation"
    );

    describe_counter!(
        format!("{}_papers_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Papers upserted into stores after validation"
    );

    describe_counter!(
        format!("{}_fetch_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Paper ids the provider failed to resolve"
    );

    describe_counter!(
        format!("{}_validation_drops_total", METRICS_PREFIX),
        Unit::Count,
        "Fetched papers dropped before ingestion"
    );

    describe_counter!(
        format!("{}_consistency_warnings_total", METRICS_PREFIX),
        Unit::Count,
        "Requested-but-absent or mismatched provider responses"
    );

    tracing::info!("Metrics registered");
}

/// Record one submitted job
pub fn record_job_submitted() {
    counter!(format!("{}_jobs_submitted_total", METRICS_PREFIX)).increment(1);
    gauge!(format!("{}_jobs_active", METRICS_PREFIX)).increment(1.0);
}

/// Record a job reaching a terminal state
pub fn record_job_finished(status: &str) {
    counter!(
        format!("{}_jobs_finished_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
    gauge!(format!("{}_jobs_active", METRICS_PREFIX)).decrement(1.0);
}

/// Record the outcome of one retrieval batch
pub fn record_fetch_batch(provider: &str, fetched: usize, failed: usize) {
    counter!(
        format!("{}_papers_fetched_total", METRICS_PREFIX),
        "provider" => provider.to_string()
    )
    .increment(fetched as u64);

    if failed > 0 {
        counter!(
            format!("{}_fetch_failures_total", METRICS_PREFIX),
            "provider" => provider.to_string()
        )
        .increment(failed as u64);
    }
}

/// Record papers that survived validation and reached a store
pub fn record_papers_ingested(count: usize) {
    if count > 0 {
        counter!(format!("{}_papers_ingested_total", METRICS_PREFIX)).increment(count as u64);
    }
}

/// Record one completed crawl iteration
pub fn record_iteration() {
    counter!(format!("{}_iterations_total", METRICS_PREFIX)).increment(1);
}

/// Record papers dropped by validation
pub fn record_validation_drops(count: usize) {
    if count > 0 {
        counter!(format!("{}_validation_drops_total", METRICS_PREFIX)).increment(count as u64);
    }
}

/// Record consistency warnings from one ingestion pass
pub fn record_consistency_warnings(count: usize) {
    if count > 0 {
        counter!(format!("{}_consistency_warnings_total", METRICS_PREFIX)).increment(count as u64);
    }
}

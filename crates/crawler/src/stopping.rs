//! Stopping policy
//!
//! Pure predicate over run state. Configuration validity is checked at job
//! submission (see `StoppingConfig::validate`); by the time this runs the
//! limits are known-good.

use citewalk_common::config::StoppingConfig;
use std::fmt;

/// Why a crawl run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Iteration limit reached
    MaxIterations,
    /// Store grew to the configured size cap
    StoreSize,
    /// Sampler returned an empty batch
    FrontierExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MaxIterations => "max iterations reached",
            StopReason::StoreSize => "store size limit reached",
            StopReason::FrontierExhausted => "candidate pool exhausted",
        };
        f.write_str(s)
    }
}

/// Decide whether the crawl loop continues.
///
/// Stops when the iteration count or the store size hits its limit. The
/// store-size check applies even at iteration 0: a store already at the cap
/// stops the run before any further retrieval.
pub fn should_stop(
    current_iteration: u32,
    store_len: usize,
    config: &StoppingConfig,
) -> Option<StopReason> {
    if current_iteration >= config.max_iterations {
        return Some(StopReason::MaxIterations);
    }
    if store_len >= config.max_store_size {
        return Some(StopReason::StoreSize);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_iterations: u32, max_store_size: usize) -> StoppingConfig {
        StoppingConfig {
            max_iterations,
            max_store_size,
        }
    }

    #[test]
    fn test_continues_below_limits() {
        assert_eq!(should_stop(0, 0, &config(3, 100)), None);
        assert_eq!(should_stop(2, 99, &config(3, 100)), None);
    }

    #[test]
    fn test_stops_at_max_iterations() {
        assert_eq!(
            should_stop(3, 10, &config(3, 100)),
            Some(StopReason::MaxIterations)
        );
    }

    #[test]
    fn test_stops_at_store_size_even_at_iteration_zero() {
        assert_eq!(
            should_stop(0, 1, &config(5, 1)),
            Some(StopReason::StoreSize)
        );
    }

    #[test]
    fn test_iteration_limit_checked_first() {
        assert_eq!(
            should_stop(5, 500, &config(5, 500)),
            Some(StopReason::MaxIterations)
        );
    }
}

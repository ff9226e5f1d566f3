//! Frontier sampler
//!
//! Draws the next batch of papers from the candidate pool using a weighted
//! categorical distribution blending three signals:
//! - graph centrality (in + out, weighted by `centrality_weight`)
//! - recency (exponential decay on publication age)
//! - keyword match (candidates matching no filter are multiplied by
//!   `no_keyword_lambda`; a lambda of exactly 0 removes them instead, so a
//!   zero coefficient hard-gates while any other value soft-biases)
//!
//! Raw scores are shifted by the minimum negative value and renormalized to
//! a probability distribution before drawing without replacement. An
//! all-zero score vector falls back to a uniform draw.

use crate::graph::CitationNetwork;
use crate::keywords::KeywordFilter;
use crate::store::PaperStore;
use chrono::{Datelike, Utc};
use citewalk_common::config::SamplingConfig;
use citewalk_common::errors::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

/// Forbidden-table reason key for papers this sampler has drawn
pub const SAMPLER_REASON: &str = "centrality_sampler";

/// Weighted frontier sampler
pub struct Sampler {
    config: SamplingConfig,
    filters: Vec<KeywordFilter>,
}

impl Sampler {
    /// Build a sampler, parsing keyword expressions. Parse failures are
    /// configuration errors and surface at job submission.
    pub fn new(config: SamplingConfig, keywords: &[String]) -> Result<Self> {
        let filters = keywords
            .iter()
            .map(|k| KeywordFilter::parse(k))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { config, filters })
    }

    /// The reason key this sampler records forbidden entries under
    pub fn reason(&self) -> &'static str {
        SAMPLER_REASON
    }

    /// Normalized sampling weights over the current candidate pool.
    ///
    /// Returns (paper id, probability) pairs summing to 1 (within floating
    /// tolerance), or an empty vector when no candidate is eligible.
    pub fn weights(
        &self,
        store: &PaperStore,
        graph: &CitationNetwork,
        avoid_retracted: bool,
    ) -> Vec<(String, f64)> {
        let candidates = store.candidates(self.reason(), avoid_retracted);
        if candidates.is_empty() {
            return Vec::new();
        }

        let ids: Vec<String> = candidates.iter().map(|p| p.id.clone()).collect();
        let centralities = graph.paper_centralities(&ids);
        let current_year = Utc::now().year();

        let mut scored: Vec<(String, f64)> = Vec::with_capacity(candidates.len());
        for record in &candidates {
            let (cin, cout) = centralities
                .get(&record.id)
                .copied()
                .unwrap_or((0.0, 0.0));
            let mut score = self.config.centrality_weight * (cin + cout);

            if let Some(year) = record.year {
                let age = (current_year - year).max(0) as f64;
                score += self.config.recency_weight * (-self.config.recency_decay * age).exp();
            }

            if !self.filters.is_empty() {
                let mut text = record.title.clone();
                if let Some(abstract_text) = store.abstract_text(&record.id) {
                    text.push(' ');
                    text.push_str(abstract_text);
                }
                let matched = self.filters.iter().any(|f| f.matches(&text));
                if !matched {
                    if self.config.no_keyword_lambda == 0.0 {
                        // Hard gate at the boundary value
                        continue;
                    }
                    score *= self.config.no_keyword_lambda;
                }
            }

            scored.push((record.id.clone(), score));
        }

        if scored.is_empty() {
            return Vec::new();
        }

        // Shift so all weights are non-negative, then renormalize
        let min = scored
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::INFINITY, f64::min);
        if min < 0.0 {
            for (_, score) in scored.iter_mut() {
                *score -= min;
            }
        }

        let total: f64 = scored.iter().map(|(_, s)| *s).sum();
        if total <= 0.0 || !total.is_finite() {
            // All-zero scores: uniform distribution over candidates
            let uniform = 1.0 / scored.len() as f64;
            for (_, score) in scored.iter_mut() {
                *score = uniform;
            }
        } else {
            for (_, score) in scored.iter_mut() {
                *score /= total;
            }
        }

        scored
    }

    /// Draw the next batch without replacement.
    ///
    /// Returns exactly `min(papers_per_iteration, eligible candidates)` ids;
    /// an empty pool yields an empty batch.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        store: &PaperStore,
        graph: &CitationNetwork,
        avoid_retracted: bool,
        rng: &mut R,
    ) -> Vec<String> {
        let weighted = self.weights(store, graph, avoid_retracted);
        if weighted.is_empty() {
            debug!("Candidate pool is empty, returning empty batch");
            return Vec::new();
        }

        let batch_size = self.config.papers_per_iteration.min(weighted.len());
        match weighted.choose_multiple_weighted(rng, batch_size, |item| item.1) {
            Ok(picked) => picked.map(|(id, _)| id.clone()).collect(),
            Err(e) => {
                // Weights were validated above; reachable only on numeric
                // edge cases. Fall back to an unweighted draw.
                warn!(error = %e, "Weighted draw failed, falling back to uniform");
                weighted
                    .choose_multiple(rng, batch_size)
                    .map(|(id, _)| id.clone())
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citewalk_common::models::PaperObject;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn paper(id: &str, title: &str, year: Option<i32>) -> PaperObject {
        PaperObject {
            id: id.into(),
            title: title.into(),
            year,
            ..Default::default()
        }
    }

    fn sampler(config: SamplingConfig, keywords: &[&str]) -> Sampler {
        let keywords: Vec<String> = keywords.iter().map(|s| s.to_string()).collect();
        Sampler::new(config, &keywords).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "Graph learning", Some(2020)));
        store.upsert(&paper("W2", "Old methods", Some(1990)));
        store.upsert(&paper("W3", "Untitled", None));
        let graph = CitationNetwork::new();

        let s = sampler(SamplingConfig::default(), &[]);
        let weights = s.weights(&store, &graph, true);
        assert_eq!(weights.len(), 3);
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_scores_fall_back_to_uniform() {
        let mut store = PaperStore::new();
        // No year, no centrality: raw scores are all zero
        store.upsert(&paper("W1", "One", None));
        store.upsert(&paper("W2", "Two", None));
        let graph = CitationNetwork::new();

        let s = sampler(SamplingConfig::default(), &[]);
        let weights = s.weights(&store, &graph, true);
        for (_, w) in &weights {
            assert!((w - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_batch_size_is_min_of_pool_and_config() {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "One", Some(2020)));
        store.upsert(&paper("W2", "Two", Some(2021)));
        let graph = CitationNetwork::new();

        let config = SamplingConfig {
            papers_per_iteration: 10,
            ..Default::default()
        };
        let s = sampler(config, &[]);
        let batch = s.draw(&store, &graph, true, &mut rng());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_empty_pool_returns_empty_batch() {
        let store = PaperStore::new();
        let graph = CitationNetwork::new();
        let s = sampler(SamplingConfig::default(), &[]);
        assert!(s.draw(&store, &graph, true, &mut rng()).is_empty());
    }

    #[test]
    fn test_zero_lambda_hard_gates() {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "Graph neural networks", Some(2020)));
        store.upsert(&paper("W2", "Fluid dynamics", Some(2020)));

        let config = SamplingConfig {
            no_keyword_lambda: 0.0,
            ..Default::default()
        };
        let s = sampler(config, &["graph"]);
        let weights = s.weights(&store, &CitationNetwork::new(), true);
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].0, "W1");
    }

    #[test]
    fn test_nonzero_lambda_downweights_but_keeps() {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "Graph neural networks", Some(2020)));
        store.upsert(&paper("W2", "Fluid dynamics", Some(2020)));

        let config = SamplingConfig {
            no_keyword_lambda: 0.1,
            ..Default::default()
        };
        let s = sampler(config, &["graph"]);
        let weights = s.weights(&store, &CitationNetwork::new(), true);
        assert_eq!(weights.len(), 2);

        let w1 = weights.iter().find(|(id, _)| id == "W1").unwrap().1;
        let w2 = weights.iter().find(|(id, _)| id == "W2").unwrap().1;
        assert!(w1 > w2);
        assert!(w2 > 0.0);
    }

    #[test]
    fn test_keyword_matches_abstract_too() {
        let mut store = PaperStore::new();
        let mut obj = paper("W1", "An unrelated title", Some(2020));
        obj.abstract_text = Some("We study graph structures".into());
        store.upsert(&obj);
        store.upsert(&paper("W2", "Also unrelated", Some(2020)));

        let config = SamplingConfig {
            no_keyword_lambda: 0.0,
            ..Default::default()
        };
        let s = sampler(config, &["graph"]);
        let weights = s.weights(&store, &CitationNetwork::new(), true);
        assert_eq!(weights.len(), 1);
        assert_eq!(weights[0].0, "W1");
    }

    #[test]
    fn test_recent_papers_weighted_higher() {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "Recent", Some(Utc::now().year())));
        store.upsert(&paper("W2", "Ancient", Some(1950)));

        let s = sampler(SamplingConfig::default(), &[]);
        let weights = s.weights(&store, &CitationNetwork::new(), true);
        let recent = weights.iter().find(|(id, _)| id == "W1").unwrap().1;
        let ancient = weights.iter().find(|(id, _)| id == "W2").unwrap().1;
        assert!(recent > ancient);
    }

    #[test]
    fn test_drawn_ids_are_unique() {
        let mut store = PaperStore::new();
        for i in 0..20 {
            store.upsert(&paper(&format!("W{}", i), "Paper", Some(2015 + (i % 10))));
        }
        let config = SamplingConfig {
            papers_per_iteration: 10,
            ..Default::default()
        };
        let s = sampler(config, &[]);
        let batch = s.draw(&store, &CitationNetwork::new(), true, &mut rng());
        assert_eq!(batch.len(), 10);
        let unique: std::collections::HashSet<_> = batch.iter().collect();
        assert_eq!(unique.len(), 10);
    }
}

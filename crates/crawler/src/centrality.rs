//! Eigenvector centrality
//!
//! Power iteration over the citation network and its edge-reversed
//! counterpart, writing `centrality_in` / `centrality_out` per node.
//! A graph with no edges gets all-zero scores rather than NaN; nodes the
//! iteration cannot score (non-finite values) are logged and left without
//! an attribute, which downstream readers treat as 0.

use crate::graph::CitationNetwork;
use citewalk_common::config::GraphConfig;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Eigenvector centrality computer
pub struct CentralityComputer {
    max_iterations: usize,
    epsilon: f64,
}

impl CentralityComputer {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            max_iterations: config.centrality_max_iterations,
            epsilon: config.centrality_epsilon,
        }
    }

    /// Recompute both centrality attributes for every node.
    ///
    /// Skipped when no node was added since the last computation.
    pub fn compute(&self, graph: &mut CitationNetwork) {
        if !graph.centrality_stale() {
            debug!("Centrality up to date, skipping recomputation");
            return;
        }

        let nodes = graph.node_ids();
        if nodes.is_empty() {
            graph.mark_centrality_fresh();
            return;
        }

        let scores_in = self.power_iteration(graph, &nodes, Direction::Incoming);
        let scores_out = self.power_iteration(graph, &nodes, Direction::Outgoing);

        let mut unscored = 0usize;
        for id in &nodes {
            let cin = scores_in.get(id).copied();
            let cout = scores_out.get(id).copied();
            match (cin, cout) {
                (Some(i), Some(o)) if i.is_finite() && o.is_finite() => {
                    graph.set_centrality(id, i, o);
                }
                _ => {
                    graph.clear_centrality(id);
                    unscored += 1;
                }
            }
        }

        if unscored > 0 {
            warn!(
                unscored,
                total = nodes.len(),
                "Some nodes left without centrality scores"
            );
        }

        graph.mark_centrality_fresh();
        debug!(nodes = nodes.len(), "Centrality recomputed");
    }

    /// One eigenvector computation. Returns an empty map when the
    /// iteration fails to converge; isolated graphs converge to all zeros.
    fn power_iteration(
        &self,
        graph: &CitationNetwork,
        nodes: &[String],
        direction: Direction,
    ) -> HashMap<String, f64> {
        let n = nodes.len();

        // No edges feed this direction: every node gets the deterministic
        // default of zero instead of a degenerate eigenvector
        let has_edges = nodes.iter().any(|id| {
            !match direction {
                Direction::Incoming => graph.incoming_of(id),
                Direction::Outgoing => graph.outgoing_of(id),
            }
            .is_empty()
        });
        if !has_edges {
            return nodes.iter().map(|id| (id.clone(), 0.0)).collect();
        }

        let initial = 1.0 / n as f64;
        let mut scores: HashMap<String, f64> =
            nodes.iter().map(|id| (id.clone(), initial)).collect();

        for _ in 0..self.max_iterations {
            let mut next: HashMap<String, f64> = HashMap::with_capacity(n);

            for id in nodes {
                let neighbors = match direction {
                    Direction::Incoming => graph.incoming_of(id),
                    Direction::Outgoing => graph.outgoing_of(id),
                };
                // x' = x + Ax, which also handles periodic components
                let contribution: f64 = neighbors
                    .iter()
                    .map(|other| scores.get(other).copied().unwrap_or(0.0))
                    .sum();
                next.insert(id.clone(), scores[id] + contribution);
            }

            let norm = next.values().map(|v| v * v).sum::<f64>().sqrt();
            if norm == 0.0 || !norm.is_finite() {
                warn!(?direction, "Centrality norm degenerated, leaving nodes unscored");
                return HashMap::new();
            }
            for value in next.values_mut() {
                *value /= norm;
            }

            let delta: f64 = nodes
                .iter()
                .map(|id| (next[id] - scores[id]).abs())
                .sum();
            scores = next;

            if delta < self.epsilon * n as f64 {
                return scores;
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            ?direction,
            "Eigenvector centrality did not converge"
        );
        HashMap::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Incoming,
    Outgoing,
}

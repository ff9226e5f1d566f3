//! Citation network
//!
//! Directed in-memory graph over the paper store: paper nodes always,
//! author and venue nodes when configured. Edges come from the store's
//! citation and reference tables. The graph grows incrementally as the
//! store grows and never shrinks within a run.

use crate::store::PaperStore;
use citewalk_common::config::GraphConfig;
use std::collections::{HashMap, HashSet};

/// Node discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Paper,
    Author,
    Venue,
}

/// Per-node attributes
#[derive(Debug, Clone)]
pub struct NodeAttrs {
    pub ntype: NodeType,

    /// Eigenvector centrality over incoming edges; `None` until computed,
    /// or when the computation failed for this node
    pub centrality_in: Option<f64>,

    /// Eigenvector centrality over the edge-reversed graph
    pub centrality_out: Option<f64>,
}

/// Directed citation network
#[derive(Debug, Default, Clone)]
pub struct CitationNetwork {
    nodes: HashMap<String, NodeAttrs>,

    /// Adjacency list: node -> nodes it points at
    outgoing: HashMap<String, Vec<String>>,

    /// Reverse adjacency: node -> nodes pointing at it
    incoming: HashMap<String, Vec<String>>,

    /// Edge set for deduplication
    edges: HashSet<(String, String)>,

    /// Nodes added since the last centrality computation
    stale: bool,
}

impl CitationNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Count of nodes of one type
    pub fn count_of(&self, ntype: NodeType) -> usize {
        self.nodes.values().filter(|n| n.ntype == ntype).count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeAttrs> {
        self.nodes.get(id)
    }

    /// True if nodes were added since centrality was last computed
    pub fn centrality_stale(&self) -> bool {
        self.stale
    }

    pub(crate) fn mark_centrality_fresh(&mut self) {
        self.stale = false;
    }

    fn add_node(&mut self, id: &str, ntype: NodeType) {
        if !self.nodes.contains_key(id) {
            self.nodes.insert(
                id.to_string(),
                NodeAttrs {
                    ntype,
                    centrality_in: None,
                    centrality_out: None,
                },
            );
            self.stale = true;
        }
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        if self
            .edges
            .insert((from.to_string(), to.to_string()))
        {
            self.outgoing
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
            self.incoming
                .entry(to.to_string())
                .or_default()
                .push(from.to_string());
        }
    }

    /// Incrementally sync the graph with the store.
    ///
    /// Adds paper nodes for every store row, author/venue nodes when
    /// configured (venues on the ignore list are skipped), and
    /// citation/reference edges. Re-running with an unchanged store leaves
    /// node and edge counts unchanged.
    pub fn update_from_store(&mut self, store: &PaperStore, config: &GraphConfig) {
        let before_nodes = self.node_count();
        let before_edges = self.edge_count();

        for record in store.papers() {
            self.add_node(&record.id, NodeType::Paper);

            if config.include_venues {
                if let Some(venue) = record.venue.as_deref() {
                    if !config
                        .venue_ignore_list
                        .iter()
                        .any(|v| v.eq_ignore_ascii_case(venue))
                    {
                        let venue_node = venue_node_id(venue);
                        self.add_node(&venue_node, NodeType::Venue);
                        self.add_edge(&record.id, &venue_node);
                    }
                }
            }
        }

        if config.include_authors {
            for (paper_id, author_id) in store.author_edges() {
                let author_node = author_node_id(author_id);
                self.add_node(&author_node, NodeType::Author);
                self.add_edge(paper_id, &author_node);
            }
        }

        // Reference edges point paper -> referenced; citation edges point
        // citing -> cited. Both are citing-direction edges in the graph.
        for (paper, referenced) in store.reference_edges() {
            self.add_edge(paper, referenced);
        }
        for (citing, cited) in store.citation_edges() {
            self.add_edge(citing, cited);
        }

        let added_nodes = self.node_count() - before_nodes;
        let added_edges = self.edge_count() - before_edges;
        if added_nodes > 0 || added_edges > 0 {
            tracing::debug!(
                added_nodes,
                added_edges,
                total_nodes = self.node_count(),
                total_edges = self.edge_count(),
                "Graph updated"
            );
        }
    }

    /// Centrality lookup limited to the requested ids that exist in the
    /// graph. Missing attributes read as 0.
    pub fn paper_centralities(&self, ids: &[String]) -> HashMap<String, (f64, f64)> {
        ids.iter()
            .filter_map(|id| {
                self.nodes.get(id).map(|attrs| {
                    (
                        id.clone(),
                        (
                            attrs.centrality_in.unwrap_or(0.0),
                            attrs.centrality_out.unwrap_or(0.0),
                        ),
                    )
                })
            })
            .collect()
    }

    pub(crate) fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub(crate) fn incoming_of(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn outgoing_of(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub(crate) fn set_centrality(&mut self, id: &str, centrality_in: f64, centrality_out: f64) {
        if let Some(attrs) = self.nodes.get_mut(id) {
            attrs.centrality_in = Some(centrality_in);
            attrs.centrality_out = Some(centrality_out);
        }
    }

    pub(crate) fn clear_centrality(&mut self, id: &str) {
        if let Some(attrs) = self.nodes.get_mut(id) {
            attrs.centrality_in = None;
            attrs.centrality_out = None;
        }
    }
}

fn venue_node_id(venue: &str) -> String {
    format!("venue:{}", venue.to_lowercase())
}

fn author_node_id(author_id: &str) -> String {
    format!("author:{}", author_id)
}

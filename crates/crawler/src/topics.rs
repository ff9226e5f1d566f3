//! Topic assignment boundary
//!
//! The crawler never fits topic models itself; it hands the finished store
//! to an external `TopicAssigner` and only consumes cluster membership for
//! the topic-paper views.

use crate::store::PaperStore;
use citewalk_common::errors::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One topic cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCluster {
    pub id: usize,
    pub label: String,
    pub paper_ids: Vec<String>,
}

/// Full topic assignment over a finished store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicAssignment {
    pub clusters: Vec<TopicCluster>,

    /// Dominant topic per paper
    pub paper_topics: HashMap<String, usize>,
}

impl TopicAssignment {
    pub fn cluster(&self, topic_id: usize) -> Option<&TopicCluster> {
        self.clusters.iter().find(|c| c.id == topic_id)
    }
}

/// External topic-model capability
pub trait TopicAssigner: Send + Sync {
    /// Cluster the store's papers into `num_topics` topics using the named
    /// model ("nmf", "lda")
    fn assign_topics(
        &self,
        store: &PaperStore,
        model: &str,
        num_topics: usize,
    ) -> Result<TopicAssignment>;
}

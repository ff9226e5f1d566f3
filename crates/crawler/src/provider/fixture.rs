//! In-memory provider backed by fixed paper objects
//!
//! Used by tests and local runs without network access. Behaves like a real
//! adapter: unknown ids and explicitly-failing ids land in the failed list,
//! and the cumulative failed-id accessor works the same way.

use super::{FetchOutcome, MetadataProvider};
use async_trait::async_trait;
use citewalk_common::errors::Result;
use citewalk_common::models::PaperObject;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Fixture-backed metadata provider
#[derive(Default)]
pub struct StaticProvider {
    papers: HashMap<String, PaperObject>,
    failing: HashSet<String>,
    failed: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a paper to the fixture set
    pub fn with_paper(mut self, paper: PaperObject) -> Self {
        self.papers.insert(paper.id.clone(), paper);
        self
    }

    /// Mark an id as always failing, even if a paper exists for it
    pub fn with_failure(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn fetch_many(&self, ids: &[String]) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();
        for id in ids {
            match self.papers.get(id) {
                Some(paper) if !self.failing.contains(id) => {
                    outcome.papers.push(paper.clone());
                }
                _ => outcome.failed.push(id.clone()),
            }
        }
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(outcome.failed.iter().cloned());
        Ok(outcome)
    }

    async fn fetch_author_works(&self, author_id: &str) -> Result<(Vec<PaperObject>, usize)> {
        let works: Vec<PaperObject> = self
            .papers
            .values()
            .filter(|p| p.authors.iter().any(|a| a.id == author_id))
            .cloned()
            .collect();
        let count = works.len();
        Ok((works, count))
    }

    fn failed_ids(&self) -> Vec<String> {
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn name(&self) -> &str {
        "static"
    }
}

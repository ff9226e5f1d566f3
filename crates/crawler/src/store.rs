//! In-memory paper store
//!
//! Tabular collections for one crawl run: paper records, author records,
//! paper-author edges, citation/reference edges, abstracts, and the
//! forbidden table. Upserts are idempotent; edges are deduplicated; the
//! forbidden table only ever grows within a run.
//!
//! Edge endpoints that have no record yet get a stub row (`processed =
//! false`). Stubs are the crawl frontier: they are eligible for sampling
//! and filled in once their metadata is retrieved.

use citewalk_common::models::{AuthorRef, PaperObject, PaperRecord};
use std::collections::{HashMap, HashSet};

/// Forbidden reason for ids the provider failed to resolve
pub const REASON_FETCH_FAILED: &str = "fetch_failed";

/// Forbidden reason for retracted papers
pub const REASON_RETRACTED: &str = "retracted";

/// In-memory store for one crawl run
#[derive(Debug, Default, Clone)]
pub struct PaperStore {
    /// Paper rows, unique by provider-native id
    papers: HashMap<String, PaperRecord>,

    /// Insertion order, for deterministic iteration
    order: Vec<String>,

    /// Author rows, unique by author id
    authors: HashMap<String, AuthorRef>,

    /// Paper-author edges, deduplicated by (paper_id, author_id)
    paper_authors: HashSet<(String, String)>,

    /// Directed citation edges: citing paper -> cited paper
    citations: HashSet<(String, String)>,

    /// Directed reference edges: paper -> referenced paper
    references: HashSet<(String, String)>,

    /// Abstracts, only for papers with non-empty text
    abstracts: HashMap<String, String>,

    /// Exclusion table: reason -> paper ids. Append-only per reason.
    forbidden: HashMap<String, HashSet<String>>,
}

impl PaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of paper rows (stubs included)
    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Number of fully-retrieved paper rows
    pub fn processed_count(&self) -> usize {
        self.papers.values().filter(|p| p.processed).count()
    }

    pub fn get(&self, id: &str) -> Option<&PaperRecord> {
        self.papers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.papers.contains_key(id)
    }

    /// Paper ids in insertion order
    pub fn paper_ids(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Paper rows in insertion order
    pub fn papers(&self) -> impl Iterator<Item = &PaperRecord> {
        self.order.iter().filter_map(|id| self.papers.get(id))
    }

    /// Upsert a fetched paper object, returning true if the row was new.
    ///
    /// Existing rows are updated in place (crawl-state flags preserved).
    /// Author rows, paper-author edges, and citation/reference edges are
    /// appended with deduplication. Edge endpoints unknown to the store
    /// become stub rows.
    pub fn upsert(&mut self, obj: &PaperObject) -> bool {
        let created = match self.papers.get_mut(&obj.id) {
            Some(record) => {
                record.update_from_object(obj);
                false
            }
            None => {
                self.papers
                    .insert(obj.id.clone(), PaperRecord::from_object(obj));
                self.order.push(obj.id.clone());
                true
            }
        };

        if let Some(text) = obj.abstract_text.as_deref() {
            if !text.trim().is_empty() {
                self.abstracts.insert(obj.id.clone(), text.to_string());
            }
        }

        for author in &obj.authors {
            self.authors
                .entry(author.id.clone())
                .or_insert_with(|| author.clone());
            self.paper_authors
                .insert((obj.id.clone(), author.id.clone()));
        }

        for referenced in &obj.referenced_ids {
            self.ensure_stub(referenced);
            self.references
                .insert((obj.id.clone(), referenced.clone()));
        }

        for citing in &obj.citing_ids {
            self.ensure_stub(citing);
            self.citations.insert((citing.clone(), obj.id.clone()));
        }

        created
    }

    /// Create a placeholder row for a paper known only from an edge
    fn ensure_stub(&mut self, id: &str) {
        if !self.papers.contains_key(id) {
            self.papers.insert(
                id.to_string(),
                PaperRecord {
                    id: id.to_string(),
                    title: String::new(),
                    venue: None,
                    year: None,
                    doi: None,
                    processed: false,
                    is_seed: false,
                    selected: false,
                    retracted: false,
                },
            );
            self.order.push(id.to_string());
        }
    }

    /// Flag papers as part of the seed set
    pub fn mark_seed(&mut self, ids: &[String]) {
        for id in ids {
            if let Some(record) = self.papers.get_mut(id) {
                record.is_seed = true;
            }
        }
    }

    /// Flag papers as drawn by the sampler
    pub fn mark_selected(&mut self, ids: &[String]) {
        for id in ids {
            self.ensure_stub(id);
            if let Some(record) = self.papers.get_mut(id) {
                record.selected = true;
            }
        }
    }

    /// Add papers to the forbidden table for a reason. Entries are never
    /// removed within a run.
    pub fn forbid(&mut self, ids: &[String], reason: &str) {
        let entry = self.forbidden.entry(reason.to_string()).or_default();
        for id in ids {
            entry.insert(id.clone());
        }
    }

    pub fn is_forbidden(&self, id: &str, reason: &str) -> bool {
        self.forbidden
            .get(reason)
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }

    pub fn forbidden_count(&self, reason: &str) -> usize {
        self.forbidden.get(reason).map(|ids| ids.len()).unwrap_or(0)
    }

    /// Candidate pool for the sampler: papers neither selected, nor
    /// forbidden for the given reason, nor (optionally) retracted.
    pub fn candidates(&self, reason: &str, avoid_retracted: bool) -> Vec<&PaperRecord> {
        self.papers()
            .filter(|p| !p.selected)
            .filter(|p| !self.is_forbidden(&p.id, reason))
            .filter(|p| !self.is_forbidden(&p.id, REASON_FETCH_FAILED))
            .filter(|p| !(avoid_retracted && p.retracted))
            .collect()
    }

    pub fn abstract_text(&self, id: &str) -> Option<&str> {
        self.abstracts.get(id).map(|s| s.as_str())
    }

    /// Author names for one paper, sorted for stable output
    pub fn authors_of(&self, paper_id: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .paper_authors
            .iter()
            .filter(|(pid, _)| pid == paper_id)
            .filter_map(|(_, aid)| self.authors.get(aid))
            .map(|a| a.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Citation edges (citing -> cited)
    pub fn citation_edges(&self) -> impl Iterator<Item = &(String, String)> {
        self.citations.iter()
    }

    /// Reference edges (paper -> referenced)
    pub fn reference_edges(&self) -> impl Iterator<Item = &(String, String)> {
        self.references.iter()
    }

    /// Paper-author edges
    pub fn author_edges(&self) -> impl Iterator<Item = &(String, String)> {
        self.paper_authors.iter()
    }

    pub fn venue_of(&self, paper_id: &str) -> Option<&str> {
        self.papers
            .get(paper_id)
            .and_then(|p| p.venue.as_deref())
    }
}

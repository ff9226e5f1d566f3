//! Result assembler
//!
//! Projects a completed crawl's store and graph into paginated paper
//! summaries and topic membership views. Strictly read-only over the
//! artifacts; the only consumer is the HTTP surface.

use crate::coordinator::CrawlArtifacts;
use citewalk_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: usize = 25;
const MAX_PER_PAGE: usize = 100;

/// One paper, flattened for consumers
#[derive(Debug, Clone, Serialize)]
pub struct PaperSummary {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub centrality_in: f64,
    pub centrality_out: f64,
    pub is_seed: bool,
    pub retracted: bool,
    pub selected: bool,
    pub topic_id: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CentralityIn,
    CentralityOut,
    Year,
    Title,
}

/// Query parameters for paper listings
#[derive(Debug, Clone, Deserialize)]
pub struct PaperQuery {
    #[serde(default = "default_page")]
    pub page: usize,

    #[serde(default = "default_per_page")]
    pub per_page: usize,

    #[serde(default = "default_sort")]
    pub sort: SortField,

    /// Restrict the listing to seed papers
    #[serde(default)]
    pub seeds_only: bool,

    /// Keep retracted papers in the listing
    #[serde(default = "default_true")]
    pub include_retracted: bool,

    /// Case-insensitive substring match on the title
    #[serde(default)]
    pub search: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

fn default_sort() -> SortField {
    SortField::CentralityIn
}

fn default_true() -> bool {
    true
}

impl Default for PaperQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            sort: default_sort(),
            seeds_only: false,
            include_retracted: true,
            search: None,
        }
    }
}

/// One page of results plus pagination bookkeeping
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Topic cluster summary for listings
#[derive(Debug, Clone, Serialize)]
pub struct TopicSummary {
    pub id: usize,
    pub label: String,
    pub paper_count: usize,
}

/// Read-only view over one completed job's artifacts
pub struct ResultAssembler<'a> {
    artifacts: &'a CrawlArtifacts,
}

impl<'a> ResultAssembler<'a> {
    pub fn new(artifacts: &'a CrawlArtifacts) -> Self {
        Self { artifacts }
    }

    /// Paginated paper summaries over the whole store
    pub fn papers(&self, query: &PaperQuery) -> Page<PaperSummary> {
        let summaries = self.filtered_summaries(query, None);
        paginate(summaries, query)
    }

    /// Paginated paper summaries restricted to one topic cluster
    pub fn topic_papers(&self, topic_id: usize, query: &PaperQuery) -> Result<Page<PaperSummary>> {
        let topics = self.artifacts.topics.as_ref().ok_or_else(|| AppError::NotFound {
            resource_type: "topic assignment".into(),
            id: topic_id.to_string(),
        })?;
        let cluster = topics.cluster(topic_id).ok_or_else(|| AppError::NotFound {
            resource_type: "topic".into(),
            id: topic_id.to_string(),
        })?;

        let members: std::collections::HashSet<&str> =
            cluster.paper_ids.iter().map(|s| s.as_str()).collect();
        let summaries = self.filtered_summaries(query, Some(&members));
        Ok(paginate(summaries, query))
    }

    /// Cluster summaries, empty when no topic assignment ran
    pub fn topics(&self) -> Vec<TopicSummary> {
        self.artifacts
            .topics
            .as_ref()
            .map(|t| {
                t.clusters
                    .iter()
                    .map(|c| TopicSummary {
                        id: c.id,
                        label: c.label.clone(),
                        paper_count: c.paper_ids.len(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn filtered_summaries(
        &self,
        query: &PaperQuery,
        members: Option<&std::collections::HashSet<&str>>,
    ) -> Vec<PaperSummary> {
        let store = &self.artifacts.store;
        let graph = &self.artifacts.graph;
        let ids: Vec<String> = store.paper_ids().cloned().collect();
        let centralities = graph.paper_centralities(&ids);
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        store
            .papers()
            .filter(|record| !query.seeds_only || record.is_seed)
            .filter(|record| query.include_retracted || !record.retracted)
            .filter(|record| match &search {
                Some(needle) => record.title.to_lowercase().contains(needle),
                None => true,
            })
            .filter(|record| match members {
                Some(ids) => ids.contains(record.id.as_str()),
                None => true,
            })
            .map(|record| {
                let (centrality_in, centrality_out) =
                    centralities.get(&record.id).copied().unwrap_or((0.0, 0.0));
                PaperSummary {
                    id: record.id.clone(),
                    title: record.title.clone(),
                    authors: store
                        .authors_of(&record.id)
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    venue: record.venue.clone(),
                    year: record.year,
                    centrality_in,
                    centrality_out,
                    is_seed: record.is_seed,
                    retracted: record.retracted,
                    selected: record.selected,
                    topic_id: self
                        .artifacts
                        .topics
                        .as_ref()
                        .and_then(|t| t.paper_topics.get(&record.id).copied()),
                }
            })
            .collect()
    }
}

fn paginate(mut summaries: Vec<PaperSummary>, query: &PaperQuery) -> Page<PaperSummary> {
    match query.sort {
        // Centrality and year sort descending, ties broken by id for
        // stable pages
        SortField::CentralityIn => summaries.sort_by(|a, b| {
            b.centrality_in
                .total_cmp(&a.centrality_in)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortField::CentralityOut => summaries.sort_by(|a, b| {
            b.centrality_out
                .total_cmp(&a.centrality_out)
                .then_with(|| a.id.cmp(&b.id))
        }),
        SortField::Year => {
            summaries.sort_by(|a, b| b.year.cmp(&a.year).then_with(|| a.id.cmp(&b.id)))
        }
        SortField::Title => {
            summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)))
        }
    }

    let total = summaries.len();
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);
    let page = query.page.max(1);
    let total_pages = total.div_ceil(per_page).max(1);

    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = (start + per_page).min(total);
    let items = summaries[start..end].to_vec();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CrawlReport;
    use crate::graph::CitationNetwork;
    use crate::store::PaperStore;
    use crate::topics::{TopicAssignment, TopicCluster};
    use citewalk_common::config::GraphConfig;
    use citewalk_common::models::PaperObject;

    fn paper(id: &str, title: &str, year: Option<i32>) -> PaperObject {
        PaperObject {
            id: id.into(),
            title: title.into(),
            year,
            ..Default::default()
        }
    }

    fn artifacts() -> CrawlArtifacts {
        let mut store = PaperStore::new();
        store.upsert(&paper("W1", "Graph neural networks", Some(2021)));
        store.upsert(&paper("W2", "Citation analysis", Some(2019)));
        let mut retracted = paper("W3", "Withdrawn result", Some(2020));
        retracted.is_retracted = true;
        store.upsert(&retracted);
        store.mark_seed(&["W1".to_string()]);

        let mut graph = CitationNetwork::new();
        graph.update_from_store(&store, &GraphConfig::default());

        CrawlArtifacts {
            store,
            graph,
            report: CrawlReport::default(),
            topics: Some(TopicAssignment {
                clusters: vec![TopicCluster {
                    id: 0,
                    label: "graphs".into(),
                    paper_ids: vec!["W1".into()],
                }],
                paper_topics: [("W1".to_string(), 0)].into_iter().collect(),
            }),
        }
    }

    #[test]
    fn test_papers_paginates_and_counts() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);

        let query = PaperQuery {
            per_page: 2,
            ..Default::default()
        };
        let page = assembler.papers(&query);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);

        let second = assembler.papers(&PaperQuery {
            page: 2,
            per_page: 2,
            ..Default::default()
        });
        assert_eq!(second.items.len(), 1);
    }

    #[test]
    fn test_filters_seeds_and_retracted() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);

        let seeds = assembler.papers(&PaperQuery {
            seeds_only: true,
            ..Default::default()
        });
        assert_eq!(seeds.total, 1);
        assert_eq!(seeds.items[0].id, "W1");
        assert_eq!(seeds.items[0].topic_id, Some(0));

        let clean = assembler.papers(&PaperQuery {
            include_retracted: false,
            ..Default::default()
        });
        assert_eq!(clean.total, 2);
        assert!(clean.items.iter().all(|p| !p.retracted));
    }

    #[test]
    fn test_title_search_is_case_insensitive() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);

        let page = assembler.papers(&PaperQuery {
            search: Some("NEURAL".into()),
            ..Default::default()
        });
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "W1");
    }

    #[test]
    fn test_sort_by_year_descending() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);

        let page = assembler.papers(&PaperQuery {
            sort: SortField::Year,
            ..Default::default()
        });
        let years: Vec<Option<i32>> = page.items.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![Some(2021), Some(2020), Some(2019)]);
    }

    #[test]
    fn test_topic_papers_membership_and_unknown_topic() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);

        let page = assembler
            .topic_papers(0, &PaperQuery::default())
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, "W1");

        assert!(assembler.topic_papers(9, &PaperQuery::default()).is_err());
    }

    #[test]
    fn test_topics_listing() {
        let artifacts = artifacts();
        let assembler = ResultAssembler::new(&artifacts);
        let topics = assembler.topics();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].paper_count, 1);
    }
}

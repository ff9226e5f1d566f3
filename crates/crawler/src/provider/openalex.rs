//! OpenAlex metadata provider
//!
//! Fetches works in batches via the filter endpoint and normalizes them
//! into `PaperObject`s. Requests retry with exponential backoff; a request
//! that still fails after retries is a provider-unavailable error (the
//! whole batch is lost), while ids simply absent from a successful response
//! are recorded as failed and the call succeeds with partial data.

use super::{FetchOutcome, MetadataProvider};
use async_trait::async_trait;
use citewalk_common::config::CrawlerConfig;
use citewalk_common::errors::{AppError, Result};
use citewalk_common::models::{AuthorRef, PaperObject};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAlex batches at most this many ids per filter expression
const MAX_IDS_PER_REQUEST: usize = 50;

/// Page size for cursor-paginated author listings
const AUTHOR_PAGE_SIZE: usize = 200;

const MAX_RETRIES: u32 = 3;

const OPENALEX_ID_PREFIX: &str = "https://openalex.org/";

/// OpenAlex API client
pub struct OpenAlexProvider {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,

    /// Cumulative ids this adapter failed to resolve
    failed: Mutex<Vec<String>>,
}

#[derive(Deserialize)]
struct WorksResponse {
    #[serde(default)]
    meta: Option<Meta>,
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Deserialize)]
struct Meta {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize, Default)]
struct Work {
    #[serde(default)]
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    is_retracted: bool,
    #[serde(default)]
    primary_location: Option<Location>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(default)]
    referenced_works: Vec<String>,
    #[serde(default)]
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Deserialize, Default)]
struct Location {
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Deserialize, Default)]
struct Source {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize, Default)]
struct Authorship {
    #[serde(default)]
    author: Option<Author>,
}

#[derive(Deserialize, Default)]
struct Author {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

impl OpenAlexProvider {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            base_url: config.openalex_base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
            failed: Mutex::new(Vec::new()),
        })
    }

    /// Make a works request with retry
    async fn request_with_retry(&self, url: &str) -> Result<WorksResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(url).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        error = %e,
                        "OpenAlex request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => AppError::ProviderUnavailable {
                message: format!("openalex unreachable after {} attempts: {}", MAX_RETRIES, e),
            },
            None => AppError::ProviderUnavailable {
                message: "openalex unreachable".into(),
            },
        })
    }

    async fn make_request(&self, url: &str) -> Result<WorksResponse> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Provider {
                message: format!("openalex returned status {}", response.status()),
            });
        }
        Ok(response.json::<WorksResponse>().await?)
    }

    fn works_url(&self, filter: &str, per_page: usize, cursor: Option<&str>) -> String {
        let mut url = format!(
            "{}/works?filter={}&per-page={}",
            self.base_url, filter, per_page
        );
        if let Some(cursor) = cursor {
            url.push_str("&cursor=");
            url.push_str(cursor);
        }
        if let Some(mailto) = &self.mailto {
            url.push_str("&mailto=");
            url.push_str(mailto);
        }
        url
    }

    fn record_failed(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut failed = self.failed.lock().unwrap_or_else(|e| e.into_inner());
        failed.extend(ids.iter().cloned());
    }
}

#[async_trait]
impl MetadataProvider for OpenAlexProvider {
    async fn fetch_many(&self, ids: &[String]) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let filter = format!("openalex_id:{}", chunk.join("|"));
            let url = self.works_url(&filter, chunk.len(), None);

            let response = self.request_with_retry(&url).await?;

            let mut returned: HashSet<String> = HashSet::with_capacity(response.results.len());
            for work in response.results {
                let paper = normalize_work(work);
                if paper.id.is_empty() {
                    continue;
                }
                returned.insert(paper.id.clone());
                outcome.papers.push(paper);
            }

            for id in chunk {
                if !returned.contains(id) {
                    outcome.failed.push(id.clone());
                }
            }
        }

        debug!(
            requested = ids.len(),
            fetched = outcome.papers.len(),
            failed = outcome.failed.len(),
            "OpenAlex batch fetched"
        );
        self.record_failed(&outcome.failed);
        Ok(outcome)
    }

    async fn fetch_author_works(&self, author_id: &str) -> Result<(Vec<PaperObject>, usize)> {
        let filter = format!("authorships.author.id:{}", author_id);
        let mut papers: Vec<PaperObject> = Vec::new();
        let mut total = 0usize;
        let mut pages = 0usize;

        // Cursor pagination: "*" starts the walk, meta.next_cursor continues
        // it until the listing is exhausted
        let mut cursor = Some("*".to_string());
        while let Some(current) = cursor.take() {
            let url = self.works_url(&filter, AUTHOR_PAGE_SIZE, Some(&current));
            let WorksResponse { meta, results } = self.request_with_retry(&url).await?;
            pages += 1;

            if let Some(meta) = &meta {
                total = meta.count;
            }
            let page_len = results.len();
            papers.extend(
                results
                    .into_iter()
                    .map(normalize_work)
                    .filter(|p| !p.id.is_empty()),
            );

            if page_len == 0 {
                break;
            }
            if total > 0 && papers.len() >= total {
                break;
            }
            cursor = meta
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.is_empty());
        }

        debug!(
            author_id,
            fetched = papers.len(),
            total,
            pages,
            "OpenAlex author works fetched"
        );
        Ok((papers, total))
    }

    fn failed_ids(&self) -> Vec<String> {
        self.failed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn name(&self) -> &str {
        "openalex"
    }
}

/// Strip the URL prefix OpenAlex puts on entity ids
fn short_id(id: &str) -> String {
    id.strip_prefix(OPENALEX_ID_PREFIX).unwrap_or(id).to_string()
}

fn normalize_work(work: Work) -> PaperObject {
    PaperObject {
        id: short_id(&work.id),
        title: work.display_name.unwrap_or_default(),
        venue: work
            .primary_location
            .and_then(|l| l.source)
            .and_then(|s| s.display_name),
        year: work.publication_year,
        doi: work.doi,
        abstract_text: work
            .abstract_inverted_index
            .as_ref()
            .map(reconstruct_abstract),
        is_retracted: work.is_retracted,
        authors: work
            .authorships
            .into_iter()
            .filter_map(|a| a.author)
            .filter_map(|a| match (a.id, a.display_name) {
                (Some(id), Some(name)) => Some(AuthorRef {
                    id: short_id(&id),
                    name,
                }),
                _ => None,
            })
            .collect(),
        referenced_ids: work
            .referenced_works
            .iter()
            .map(|w| short_id(w))
            .collect(),
        citing_ids: Vec::new(),
    }
}

/// Rebuild abstract text from OpenAlex's inverted index
fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positions: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, places)| places.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positions.sort_unstable_by_key(|(p, _)| *p);
    positions
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

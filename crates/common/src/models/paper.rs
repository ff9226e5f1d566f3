//! Paper models
//!
//! `PaperObject` is the provider-facing shape: whatever a bibliographic
//! source returns for one work, already normalized out of its wire format.
//! `PaperRecord` is the store-facing row, unique by provider-native id.

use serde::{Deserialize, Serialize};

/// Author reference as returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
}

/// One work as returned by a metadata provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaperObject {
    /// Provider-native identifier
    pub id: String,

    pub title: String,

    pub venue: Option<String>,

    pub year: Option<i32>,

    pub doi: Option<String>,

    /// Abstract text; empty abstracts are treated as absent
    pub abstract_text: Option<String>,

    pub is_retracted: bool,

    pub authors: Vec<AuthorRef>,

    /// Works this paper cites (outgoing reference edges)
    pub referenced_ids: Vec<String>,

    /// Works citing this paper (incoming citation edges), when the
    /// provider exposes them
    pub citing_ids: Vec<String>,
}

impl PaperObject {
    /// Minimal validity check applied before ingestion
    pub fn is_valid(&self, require_abstract: bool) -> bool {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return false;
        }
        if require_abstract {
            return self
                .abstract_text
                .as_deref()
                .map(|a| !a.trim().is_empty())
                .unwrap_or(false);
        }
        true
    }
}

/// One row in the paper store, unique by `id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    pub id: String,
    pub title: String,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,

    /// Full metadata has been retrieved for this paper
    pub processed: bool,

    /// Paper was part of the seed set
    pub is_seed: bool,

    /// Paper has been drawn by the sampler at some iteration
    pub selected: bool,

    pub retracted: bool,
}

impl PaperRecord {
    /// Build a record from a fetched paper object
    pub fn from_object(obj: &PaperObject) -> Self {
        Self {
            id: obj.id.clone(),
            title: obj.title.clone(),
            venue: obj.venue.clone(),
            year: obj.year,
            doi: obj.doi.clone(),
            processed: true,
            is_seed: false,
            selected: false,
            retracted: obj.is_retracted,
        }
    }

    /// Overwrite metadata fields from a re-fetched object, preserving
    /// crawl-state flags (seed, selected)
    pub fn update_from_object(&mut self, obj: &PaperObject) {
        self.title = obj.title.clone();
        self.venue = obj.venue.clone();
        self.year = obj.year;
        self.doi = obj.doi.clone();
        self.processed = true;
        self.retracted = obj.is_retracted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: &str, title: &str) -> PaperObject {
        PaperObject {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validity_requires_id_and_title() {
        assert!(paper("W1", "A title").is_valid(false));
        assert!(!paper("", "A title").is_valid(false));
        assert!(!paper("W1", "  ").is_valid(false));
    }

    #[test]
    fn test_validity_abstract_requirement() {
        let mut p = paper("W1", "A title");
        assert!(!p.is_valid(true));
        p.abstract_text = Some("".into());
        assert!(!p.is_valid(true));
        p.abstract_text = Some("Some abstract".into());
        assert!(p.is_valid(true));
    }

    #[test]
    fn test_update_preserves_flags() {
        let obj = paper("W1", "Old title");
        let mut record = PaperRecord::from_object(&obj);
        record.is_seed = true;
        record.selected = true;

        let newer = paper("W1", "New title");
        record.update_from_object(&newer);

        assert_eq!(record.title, "New title");
        assert!(record.is_seed);
        assert!(record.selected);
    }
}

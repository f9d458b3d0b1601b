//! Provenance facts and rendered records

use crate::revision::RepoInfo;
use crate::vocabulary::{Field, Vocabulary};
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

/// Typed facts gathered for one stamping call
///
/// Rendered into a [`ProvenanceRecord`] by a [`Vocabulary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceFacts {
    /// Wall-clock time of assembly
    pub created_at: DateTime<FixedOffset>,
    /// Invoking user, if known
    pub user: Option<String>,
    /// Host/platform descriptor
    pub host: String,
    /// Caller-identifying path, if determinable
    pub caller: Option<PathBuf>,
    /// Repository state, `None` when no repository was found
    pub repository: Option<RepoInfo>,
}

impl ProvenanceFacts {
    /// Text for one field; absent data renders as the empty string
    #[must_use]
    pub fn text(&self, field: Field, vocabulary: Vocabulary) -> String {
        let repo = self.repository.as_ref();
        match field {
            Field::CreatedAt => vocabulary.format_time(&self.created_at),
            Field::User => self.user.clone().unwrap_or_default(),
            Field::Host => self.host.clone(),
            Field::Caller => self
                .caller
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            Field::RepoRoot => repo
                .map(|r| r.root.display().to_string())
                .unwrap_or_default(),
            Field::CommitId => repo
                .map(|r| r.commit_id.to_ascii_lowercase())
                .unwrap_or_default(),
            Field::Author => repo.map(|r| r.author.clone()).unwrap_or_default(),
            Field::CommitTime => repo
                .map(|r| vocabulary.format_time(&r.commit_time))
                .unwrap_or_default(),
        }
    }
}

/// Flat, ordered tag → value mapping written into an artifact
///
/// # Invariants
/// - Key set is exactly the vocabulary's key set, in vocabulary order
/// - Every value is text; absent data is the empty string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceRecord {
    vocabulary: Vocabulary,
    entries: IndexMap<String, String>,
}

impl ProvenanceRecord {
    /// Render facts under a vocabulary
    #[must_use]
    pub fn render(facts: &ProvenanceFacts, vocabulary: Vocabulary) -> Self {
        let entries = vocabulary
            .tags()
            .iter()
            .map(|tag| (tag.name.to_string(), facts.text(tag.field, vocabulary)))
            .collect();

        Self {
            vocabulary,
            entries,
        }
    }

    /// Vocabulary the record was rendered under
    #[inline]
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Ordered entries
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &IndexMap<String, String> {
        &self.entries
    }

    /// Consume into the ordered entries
    #[inline]
    #[must_use]
    pub fn into_entries(self) -> IndexMap<String, String> {
        self.entries
    }

    /// Value for a tag
    #[inline]
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.entries.get(tag).map(String::as_str)
    }

    /// Iterate `(tag, value)` pairs in vocabulary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of tags
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for rendered records; present for API symmetry
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an extracted mapping holds exactly this record
    #[must_use]
    pub fn matches(&self, extracted: &IndexMap<String, String>) -> bool {
        &self.entries == extracted
    }
}

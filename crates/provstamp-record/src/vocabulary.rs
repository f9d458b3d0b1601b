//! Versioned tag vocabulary
//!
//! A [`Vocabulary`] is the fixed, ordered set of tag names a stamping engine
//! writes. Every version also fixes the textual shape of each value so that
//! extracted metadata can be checked against what was written.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Timestamp format used by [`Vocabulary::V2`]
pub const V2_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Timestamp format used by [`Vocabulary::V1`]
pub const V1_TIME_FORMAT: &str = "%b %d %Y %H:%M:%S %z";

/// Fact a tag is rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Wall-clock creation time of the stamp
    CreatedAt,
    /// Invoking user identity
    User,
    /// Host/platform descriptor
    Host,
    /// Caller-identifying path
    Caller,
    /// Repository root path
    RepoRoot,
    /// Current commit identifier
    CommitId,
    /// Commit author name
    Author,
    /// Commit timestamp
    CommitTime,
}

impl Field {
    /// Whether this field comes from the revision source
    #[inline]
    #[must_use]
    pub const fn is_repository_derived(self) -> bool {
        matches!(
            self,
            Self::RepoRoot | Self::CommitId | Self::Author | Self::CommitTime
        )
    }
}

/// Textual shape a tag value must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Free text
    Text,
    /// Timestamp in the vocabulary's time format
    Timestamp,
    /// Lowercase hexadecimal
    Hex,
}

/// One entry of a vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpec {
    /// Tag name as written to the container
    pub name: &'static str,
    /// Fact the value is rendered from
    pub field: Field,
    /// Expected value shape
    pub shape: ValueShape,
}

impl TagSpec {
    const fn new(name: &'static str, field: Field, shape: ValueShape) -> Self {
        Self { name, field, shape }
    }
}

const V1_TAGS: &[TagSpec] = &[
    TagSpec::new("parent_script_dir", Field::Caller, ValueShape::Text),
    TagSpec::new("time_file_was_created", Field::CreatedAt, ValueShape::Timestamp),
    TagSpec::new("file_was_created_by_user", Field::User, ValueShape::Text),
    TagSpec::new("git_repo_path", Field::RepoRoot, ValueShape::Text),
    TagSpec::new("git_repo_author", Field::Author, ValueShape::Text),
    TagSpec::new("time_git_repo_commit", Field::CommitTime, ValueShape::Timestamp),
    TagSpec::new("git_repo_hash", Field::CommitId, ValueShape::Hex),
    TagSpec::new("uname_output", Field::Host, ValueShape::Text),
];

const V2_TAGS: &[TagSpec] = &[
    TagSpec::new("created_at", Field::CreatedAt, ValueShape::Timestamp),
    TagSpec::new("user", Field::User, ValueShape::Text),
    TagSpec::new("host", Field::Host, ValueShape::Text),
    TagSpec::new("caller", Field::Caller, ValueShape::Text),
    TagSpec::new("repo_root", Field::RepoRoot, ValueShape::Text),
    TagSpec::new("commit_id", Field::CommitId, ValueShape::Hex),
    TagSpec::new("author", Field::Author, ValueShape::Text),
    TagSpec::new("commit_time", Field::CommitTime, ValueShape::Timestamp),
];

/// Fixed, versioned tag vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Vocabulary {
    /// Legacy long-form field names
    V1,
    /// Current vocabulary
    #[default]
    V2,
}

impl Vocabulary {
    /// Vocabulary used by the running engine
    pub const CURRENT: Self = Self::V2;

    /// Every vocabulary this engine knows, oldest first
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    /// Numeric version tag
    #[inline]
    #[must_use]
    pub const fn version(self) -> u32 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Look up a vocabulary by version number
    ///
    /// # Errors
    /// Returns error for versions this engine does not know
    pub fn from_version(version: u32) -> Result<Self, VocabularyError> {
        match version {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(VocabularyError::UnknownVersion(other)),
        }
    }

    /// Ordered tag specifications
    #[inline]
    #[must_use]
    pub const fn tags(self) -> &'static [TagSpec] {
        match self {
            Self::V1 => V1_TAGS,
            Self::V2 => V2_TAGS,
        }
    }

    /// Ordered tag names
    #[must_use]
    pub fn keys(self) -> Vec<&'static str> {
        self.tags().iter().map(|t| t.name).collect()
    }

    /// Look up a tag by name
    #[must_use]
    pub fn spec(self, name: &str) -> Option<&'static TagSpec> {
        self.tags().iter().find(|t| t.name == name)
    }

    /// Check whether `name` belongs to this vocabulary
    #[inline]
    #[must_use]
    pub fn contains(self, name: &str) -> bool {
        self.spec(name).is_some()
    }

    /// Timestamp format for this version
    #[inline]
    #[must_use]
    pub const fn time_format(self) -> &'static str {
        match self {
            Self::V1 => V1_TIME_FORMAT,
            Self::V2 => V2_TIME_FORMAT,
        }
    }

    /// Render a timestamp in this version's format
    #[must_use]
    pub fn format_time(self, time: &DateTime<FixedOffset>) -> String {
        time.format(self.time_format()).to_string()
    }

    /// Union of tag names across every known version
    ///
    /// Clearing with this set removes fields written by older engines.
    #[must_use]
    pub fn recognized_keys() -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        for vocabulary in Self::ALL {
            for tag in vocabulary.tags() {
                if !keys.contains(&tag.name) {
                    keys.push(tag.name);
                }
            }
        }
        keys
    }

    /// Check that `value` has the shape expected for tag `name`
    ///
    /// Empty values are always accepted: they stand for absent data.
    ///
    /// # Errors
    /// Returns error if the tag is unknown or the value does not parse
    pub fn validate_value(self, name: &str, value: &str) -> Result<(), VocabularyError> {
        let spec = self
            .spec(name)
            .ok_or_else(|| VocabularyError::UnknownTag(name.to_string()))?;

        if value.is_empty() {
            return Ok(());
        }

        match spec.shape {
            ValueShape::Text => Ok(()),
            ValueShape::Hex => {
                if value
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
                {
                    Ok(())
                } else {
                    Err(VocabularyError::MalformedValue {
                        tag: name.to_string(),
                        reason: "expected lowercase hexadecimal".to_string(),
                    })
                }
            }
            ValueShape::Timestamp => DateTime::parse_from_str(value, self.time_format())
                .map(|_| ())
                .map_err(|e| VocabularyError::MalformedValue {
                    tag: name.to_string(),
                    reason: format!("expected timestamp `{}`: {e}", self.time_format()),
                }),
        }
    }
}

impl Display for Vocabulary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version())
    }
}

impl TryFrom<u32> for Vocabulary {
    type Error = VocabularyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_version(value)
    }
}

impl From<Vocabulary> for u32 {
    fn from(value: Vocabulary) -> Self {
        value.version()
    }
}

/// Vocabulary lookup and validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    /// Version number not known to this engine
    #[error("unknown vocabulary version: {0}")]
    UnknownVersion(u32),

    /// Tag name not part of the vocabulary
    #[error("tag not in vocabulary: {0}")]
    UnknownTag(String),

    /// Value does not have the expected shape
    #[error("malformed value for `{tag}`: {reason}")]
    MalformedValue { tag: String, reason: String },
}

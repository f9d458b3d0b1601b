//! Stamp request builder

use provstamp_record::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to clear before writing a fresh record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WipeMode {
    /// Write over existing tags; stale keys from other vocabularies survive
    None,
    /// Remove every tag recognised by any known vocabulary
    #[default]
    Recognized,
    /// Remove every text tag, including ones written by other tools
    All,
}

impl WipeMode {
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Recognized => "recognized",
            Self::All => "all",
        }
    }
}

impl From<bool> for WipeMode {
    /// `true` → [`WipeMode::Recognized`], `false` → [`WipeMode::None`]
    fn from(wipe_before_write: bool) -> Self {
        if wipe_before_write {
            Self::Recognized
        } else {
            Self::None
        }
    }
}

impl Display for WipeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WipeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "recognized" | "recognised" => Ok(Self::Recognized),
            "all" => Ok(Self::All),
            other => Err(format!("unknown wipe mode `{other}` (expected none, recognized or all)")),
        }
    }
}

/// Parameters of one stamp call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampRequest {
    artifact: PathBuf,
    repo_path: Option<PathBuf>,
    search_ancestors: bool,
    wipe: WipeMode,
    format_hint: Option<String>,
    vocabulary: Vocabulary,
}

impl StampRequest {
    /// Stamp `artifact` with the current vocabulary, searching for the
    /// repository from the working directory
    #[must_use]
    pub fn new(artifact: impl Into<PathBuf>) -> Self {
        Self {
            artifact: artifact.into(),
            repo_path: None,
            search_ancestors: true,
            wipe: WipeMode::default(),
            format_hint: None,
            vocabulary: Vocabulary::CURRENT,
        }
    }

    /// Repository to describe
    #[inline]
    #[must_use]
    pub fn with_repo(mut self, repo_path: impl Into<PathBuf>) -> Self {
        self.repo_path = Some(repo_path.into());
        self
    }

    /// Whether to search ancestors of the repository path
    #[inline]
    #[must_use]
    pub fn with_search_ancestors(mut self, search: bool) -> Self {
        self.search_ancestors = search;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_wipe(mut self, wipe: WipeMode) -> Self {
        self.wipe = wipe;
        self
    }

    /// Skip content sniffing and treat the artifact as `hint`
    #[inline]
    #[must_use]
    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }

    /// Write a specific vocabulary version
    #[inline]
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    #[inline]
    #[must_use]
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    #[inline]
    #[must_use]
    pub fn repo_path(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }

    /// Effective search flag (forced on when no repository path is given)
    #[inline]
    #[must_use]
    pub fn search_ancestors(&self) -> bool {
        self.search_ancestors || self.repo_path.is_none()
    }

    #[inline]
    #[must_use]
    pub fn wipe(&self) -> WipeMode {
        self.wipe
    }

    #[inline]
    #[must_use]
    pub fn format_hint(&self) -> Option<&str> {
        self.format_hint.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }
}

//! Error types for the stamping engine
//!
//! Every stamp failure names the [`StampStep`] it happened in, so callers can
//! tell a failure before any edit from one that left the artifact without
//! recognised tags.

use provstamp_format::{ContentDigest, FormatError};
use provstamp_record::VocabularyError;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Sub-step of a stamp transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampStep {
    /// Detecting the format
    Resolve,
    /// Removing recognised (or all) tags
    Clear,
    /// Writing the fresh record
    Write,
    /// Checking the primary content is unchanged
    Verify,
}

impl StampStep {
    /// Whether the artifact may have been modified when this step failed
    #[inline]
    #[must_use]
    pub fn touches_artifact(self) -> bool {
        matches!(self, Self::Clear | Self::Write | Self::Verify)
    }
}

impl Display for StampStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Clear => "clear",
            Self::Write => "write",
            Self::Verify => "verify",
        })
    }
}

/// Coarse classification of an [`EngineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    ToolInvocationFailed,
    MalformedMetadata,
    Io,
    ContentAltered,
    Producer,
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Format adapter failure during `stamp`
    #[error("stamp failed at {step}: {source}")]
    Stamp {
        /// Step that failed
        step: StampStep,
        /// Underlying failure
        #[source]
        source: FormatError,
    },

    /// Format adapter failure during `extract`
    #[error("extract failed: {0}")]
    Extract(#[source] FormatError),

    /// A recognised tag holds a value of the wrong shape
    #[error("malformed metadata: {0}")]
    Malformed(#[from] VocabularyError),

    /// Primary content digest differs after stamping
    #[error("primary content of {} changed during stamping ({} -> {})", .path.display(), .before.short(), .after.short())]
    ContentAltered {
        path: PathBuf,
        before: ContentDigest,
        after: ContentDigest,
    },

    /// Artifact producer failed; nothing was stamped
    #[error("artifact producer failed: {0}")]
    Producer(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EngineError {
    /// Wrap a format failure at `step`
    #[inline]
    pub fn at(step: StampStep) -> impl FnOnce(FormatError) -> Self {
        move |source| Self::Stamp { step, source }
    }

    /// Step a stamp failure happened in
    #[inline]
    #[must_use]
    pub fn step(&self) -> Option<StampStep> {
        match self {
            Self::Stamp { step, .. } => Some(*step),
            Self::ContentAltered { .. } => Some(StampStep::Verify),
            _ => None,
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stamp { source, .. } | Self::Extract(source) => match source {
                FormatError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
                FormatError::ToolInvocationFailed { .. } => ErrorKind::ToolInvocationFailed,
                FormatError::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
                FormatError::Io { .. } => ErrorKind::Io,
            },
            Self::Malformed(_) => ErrorKind::MalformedMetadata,
            Self::ContentAltered { .. } => ErrorKind::ContentAltered,
            Self::Producer(_) => ErrorKind::Producer,
        }
    }

    /// Underlying format error, if any
    #[must_use]
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            Self::Stamp { source, .. } | Self::Extract(source) => Some(source),
            _ => None,
        }
    }
}

//! Format adapter errors

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

/// Tag tool operation, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOperation {
    /// Reading all tags
    Read,
    /// Writing tags
    Write,
    /// Deleting named tags
    Delete,
    /// Deleting every tag
    Wipe,
}

impl Display for ToolOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Wipe => "wipe",
        };
        f.write_str(name)
    }
}

/// Errors raised by format detection and tag strategies
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Signature, hint or strategy not supported
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// External tag tool failed or timed out
    #[error("{tool} {operation} failed ({}): {detail}", .exit_code.map_or_else(|| "no exit code".to_string(), |c| format!("exit code {c}")))]
    ToolInvocationFailed {
        tool: String,
        operation: ToolOperation,
        exit_code: Option<i32>,
        detail: String,
    },

    /// Metadata present but not decodable into the expected text
    #[error("malformed metadata in `{tag}`: {reason}")]
    MalformedMetadata { tag: String, reason: String },

    /// Filesystem error on the artifact
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    /// Unsupported format named by `format`
    #[inline]
    #[must_use]
    pub fn unsupported(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Malformed metadata for `tag`
    #[inline]
    #[must_use]
    pub fn malformed(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// I/O failure on `path`
    #[inline]
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

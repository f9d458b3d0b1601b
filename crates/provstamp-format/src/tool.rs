//! Tag tool trait and shared types
//!
//! A [`TagTool`] is the narrow boundary to whatever physically edits a
//! metadata container: the in-process PNG chunk editor, or an external
//! program. Tools see raw tag names; normalisation and vocabulary filtering
//! happen above them, in [`FormatStrategy`](crate::FormatStrategy).

use crate::error::FormatError;
use indexmap::IndexMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::path::Path;

/// Ordered tag name → value mapping
pub type TagMap = IndexMap<String, String>;

/// A tag as physically stored, before normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    /// Name as the container (or tool) renders it
    pub name: String,
    /// Decoded text value
    pub value: String,
}

impl RawTag {
    /// Create a raw tag
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Reads and writes named text tags in one container format
///
/// # Contract
/// - `tag_names` and `read_named` never decode values outside the names asked
///   for, so a broken tag from another tool only fails a full `read_tags`
/// - `write_tags` replaces any tag with exactly the same raw name
/// - `delete_tags` removes tags whose raw name is in `names`, nothing else
/// - No operation touches the primary content of the file
#[cfg_attr(test, mockall::automock)]
pub trait TagTool: Send + Sync + Debug {
    /// Tool name (for logs and errors)
    fn name(&self) -> &'static str;

    /// Read every text tag in the container, in physical order
    ///
    /// # Errors
    /// I/O, tool, or decoding failure
    fn read_tags(&self, path: &Path) -> Result<Vec<RawTag>, FormatError>;

    /// Raw names of every text tag, in physical order, without their values
    ///
    /// # Errors
    /// I/O or tool failure
    fn tag_names(&self, path: &Path) -> Result<Vec<String>, FormatError> {
        Ok(self.read_tags(path)?.into_iter().map(|t| t.name).collect())
    }

    /// Read only the tags whose raw name is in `names`, in physical order
    ///
    /// # Errors
    /// I/O, tool, or decoding failure of one of the named tags
    fn read_named(&self, path: &Path, names: &[String]) -> Result<Vec<RawTag>, FormatError> {
        Ok(self
            .read_tags(path)?
            .into_iter()
            .filter(|t| names.contains(&t.name))
            .collect())
    }

    /// Write tags, replacing same-named ones
    ///
    /// # Errors
    /// I/O, tool, or encoding failure
    fn write_tags(&self, path: &Path, tags: &[RawTag]) -> Result<(), FormatError>;

    /// Delete tags by raw name; returns how many were removed
    ///
    /// # Errors
    /// I/O or tool failure
    fn delete_tags(&self, path: &Path, names: &[String]) -> Result<usize, FormatError>;

    /// Delete every text tag; returns how many were removed
    ///
    /// # Errors
    /// I/O or tool failure
    fn delete_all(&self, path: &Path) -> Result<usize, FormatError>;
}

/// Blake3 digest of an artifact's primary content
///
/// Covers everything except metadata text, so it is unchanged by stamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Short representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<blake3::Hash> for ContentDigest {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

//! Path-level format adapter
//!
//! [`FormatAdapter`] resolves a file to its [`FormatStrategy`] by explicit
//! hint or by content signature, never by extension, and forwards the
//! uniform clear/write/read contract to it.

use crate::error::FormatError;
use crate::kind::FormatKind;
use crate::registry::FormatRegistry;
use crate::strategy::FormatStrategy;
use crate::tool::{ContentDigest, TagMap};
use std::path::Path;
use std::sync::Arc;

/// Uniform metadata contract over every registered format
#[derive(Debug, Clone)]
pub struct FormatAdapter {
    registry: Arc<FormatRegistry>,
}

impl FormatAdapter {
    /// Adapter over `registry`
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<FormatRegistry>) -> Self {
        Self { registry }
    }

    /// Registry in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Determine the kind of `path`
    ///
    /// # Errors
    /// `UnsupportedFormat` for an unknown hint or signature, `Io` if the
    /// file cannot be read
    pub fn detect(path: &Path, hint: Option<&str>) -> Result<FormatKind, FormatError> {
        match hint {
            Some(hint) => hint.parse(),
            None => FormatKind::sniff_file(path),
        }
    }

    /// Strategy for `path`
    ///
    /// The returned strategy may be unimplemented; its operations then fail
    /// with `UnsupportedFormat`.
    ///
    /// # Errors
    /// See [`FormatAdapter::detect`]
    pub fn resolve(&self, path: &Path, hint: Option<&str>) -> Result<FormatStrategy, FormatError> {
        let kind = Self::detect(path, hint)?;
        let strategy = self.registry.get(kind)?.clone();
        tracing::debug!(
            "Resolved {} as {} ({})",
            path.display(),
            kind,
            if strategy.is_implemented() { "implemented" } else { "unimplemented" }
        );
        Ok(strategy)
    }

    /// Remove tags recognised under `keys`
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn clear_recognized(&self, path: &Path, keys: &[&str]) -> Result<usize, FormatError> {
        self.resolve(path, None)?.clear_recognized(path, keys)
    }

    /// Remove every text tag
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn clear_all(&self, path: &Path) -> Result<usize, FormatError> {
        self.resolve(path, None)?.clear_all(path)
    }

    /// Write `tags`
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn write(&self, path: &Path, tags: &TagMap) -> Result<(), FormatError> {
        self.resolve(path, None)?.write(path, tags)
    }

    /// Read tags recognised under `keys`
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn read(&self, path: &Path, keys: &[&str]) -> Result<TagMap, FormatError> {
        self.resolve(path, None)?.read(path, keys)
    }

    /// Every text tag under its normalised name
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn read_all(&self, path: &Path) -> Result<TagMap, FormatError> {
        self.resolve(path, None)?.read_all(path)
    }

    /// Digest of the primary content
    ///
    /// # Errors
    /// Resolution or strategy failure
    pub fn content_digest(&self, path: &Path) -> Result<ContentDigest, FormatError> {
        self.resolve(path, None)?.content_digest(path)
    }
}

impl Default for FormatAdapter {
    fn default() -> Self {
        Self::new(FormatRegistry::global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provstamp_test_utils::{minimal_png, png_with_text, tiff_bytes, write_artifact};

    #[test]
    fn resolve_sniffs_content_not_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "figure.tif", &minimal_png());

        let strategy = FormatAdapter::default().resolve(&path, None).unwrap();
        assert_eq!(strategy.kind(), FormatKind::Png);
    }

    #[test]
    fn hint_overrides_sniffing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "figure.png", &minimal_png());

        let strategy = FormatAdapter::default().resolve(&path, Some("TIF")).unwrap();
        assert_eq!(strategy.kind(), FormatKind::Tiff);
        assert!(!strategy.is_implemented());
    }

    #[test]
    fn unknown_signature_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "notes.png", b"hello world");

        let err = FormatAdapter::default().resolve(&path, None).unwrap_err();
        assert!(
            matches!(&err, FormatError::UnsupportedFormat { format } if format == "68656c6c6f20776f"),
            "{err}"
        );
    }

    #[test]
    fn unknown_hint_is_unsupported() {
        let err = FormatAdapter::default()
            .resolve(Path::new("/nonexistent"), Some("bmp"))
            .unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedFormat { .. }));
    }

    #[test]
    fn unimplemented_kind_fails_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "scan.png", &tiff_bytes());

        let mut tags = TagMap::new();
        tags.insert("user".into(), "alice".into());
        let err = FormatAdapter::default().write(&path, &tags).unwrap_err();
        assert!(matches!(&err, FormatError::UnsupportedFormat { format } if format == "tiff"));
    }

    #[test]
    fn read_all_is_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(
            dir.path(),
            "a.png",
            &png_with_text(&[("Software", "plotter"), ("Commit Id", "abc123")]),
        );

        let all = FormatAdapter::default().read_all(&path).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["software"], "plotter");
        assert_eq!(all["commit_id"], "abc123");
        assert!(FormatAdapter::default().read(&path, &["user"]).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_io() {
        let err = FormatAdapter::default()
            .resolve(Path::new("/nonexistent/a.png"), None)
            .unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
    }
}

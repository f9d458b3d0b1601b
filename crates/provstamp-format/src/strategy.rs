//! Per-format metadata strategy
//!
//! A [`FormatStrategy`] pairs a [`FormatKind`] with the [`TagTool`] that
//! edits it. Kinds without a tool are registered but unimplemented: every
//! operation on them fails with `UnsupportedFormat` before touching the file.

use crate::error::FormatError;
use crate::kind::FormatKind;
use crate::normalize::normalize_tag_name;
use crate::png::png_content_digest;
use crate::tool::{ContentDigest, RawTag, TagMap, TagTool};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Metadata strategy for one container format
#[derive(Debug, Clone)]
pub struct FormatStrategy {
    kind: FormatKind,
    tool: Option<Arc<dyn TagTool>>,
}

impl FormatStrategy {
    /// Implemented strategy backed by `tool`
    #[must_use]
    pub fn new(kind: FormatKind, tool: Arc<dyn TagTool>) -> Self {
        Self {
            kind,
            tool: Some(tool),
        }
    }

    /// Registered but unimplemented strategy
    #[inline]
    #[must_use]
    pub fn unimplemented(kind: FormatKind) -> Self {
        Self { kind, tool: None }
    }

    /// Format this strategy handles
    #[inline]
    #[must_use]
    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    /// Whether a tool backs this strategy
    #[inline]
    #[must_use]
    pub fn is_implemented(&self) -> bool {
        self.tool.is_some()
    }

    /// Backing tool
    ///
    /// # Errors
    /// `UnsupportedFormat` when the strategy is unimplemented
    pub fn tool(&self) -> Result<&dyn TagTool, FormatError> {
        self.tool
            .as_deref()
            .ok_or_else(|| FormatError::unsupported(self.kind.as_str()))
    }

    /// Fail early for unimplemented strategies
    ///
    /// # Errors
    /// `UnsupportedFormat` when the strategy is unimplemented
    pub fn require_implemented(&self) -> Result<(), FormatError> {
        self.tool().map(|_| ())
    }

    /// Raw names present in the file whose normalised form is in `keys`
    fn matching_raw_names(
        tool: &dyn TagTool,
        path: &Path,
        keys: &HashSet<String>,
    ) -> Result<Vec<String>, FormatError> {
        let mut names: Vec<String> = Vec::new();
        for name in tool.tag_names(path)? {
            if keys.contains(&normalize_tag_name(&name)) && !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Remove every tag whose normalised name is in `keys`
    ///
    /// Returns how many distinct raw names were removed.
    ///
    /// # Errors
    /// `UnsupportedFormat`, or any tool failure
    pub fn clear_recognized(&self, path: &Path, keys: &[&str]) -> Result<usize, FormatError> {
        let tool = self.tool()?;
        let keys = normalized_set(keys.iter().copied());
        let names = Self::matching_raw_names(tool, path, &keys)?;
        if names.is_empty() {
            return Ok(0);
        }

        let removed = tool.delete_tags(path, &names)?;
        tracing::debug!(
            "Cleared {} recognised tag(s) from {} via {}",
            removed,
            path.display(),
            tool.name()
        );
        Ok(removed)
    }

    /// Remove every text tag the tool can see
    ///
    /// # Errors
    /// `UnsupportedFormat`, or any tool failure
    pub fn clear_all(&self, path: &Path) -> Result<usize, FormatError> {
        let tool = self.tool()?;
        let removed = tool.delete_all(path)?;
        tracing::debug!("Wiped {} tag(s) from {}", removed, path.display());
        Ok(removed)
    }

    /// Write `tags`, replacing any existing tag that normalises to the same key
    ///
    /// # Errors
    /// `UnsupportedFormat`, or any tool failure
    pub fn write(&self, path: &Path, tags: &TagMap) -> Result<(), FormatError> {
        let tool = self.tool()?;
        if tags.is_empty() {
            return Ok(());
        }

        // Differently-rendered spellings of the same key would shadow the new value.
        let keys = normalized_set(tags.keys().map(String::as_str));
        let stale: Vec<String> = Self::matching_raw_names(tool, path, &keys)?
            .into_iter()
            .filter(|name| !tags.contains_key(name))
            .collect();
        if !stale.is_empty() {
            tool.delete_tags(path, &stale)?;
        }

        let raw: Vec<RawTag> = tags
            .iter()
            .map(|(name, value)| RawTag::new(name.clone(), value.clone()))
            .collect();
        tool.write_tags(path, &raw)?;

        tracing::debug!(
            "Wrote {} tag(s) to {} via {}",
            raw.len(),
            path.display(),
            tool.name()
        );
        Ok(())
    }

    /// Read tags whose normalised name is in `keys`, ordered as `keys`
    ///
    /// Other tags are ignored and their values never decoded.
    ///
    /// # Errors
    /// `UnsupportedFormat`, tool failure, or `MalformedMetadata` when two
    /// spellings of one key carry different values
    pub fn read(&self, path: &Path, keys: &[&str]) -> Result<TagMap, FormatError> {
        let tool = self.tool()?;
        let names = Self::matching_raw_names(tool, path, &normalized_set(keys.iter().copied()))?;
        if names.is_empty() {
            return Ok(TagMap::new());
        }

        let mut found = TagMap::new();
        for tag in tool.read_named(path, &names)? {
            let normalized = normalize_tag_name(&tag.name);
            let Some(key) = keys.iter().find(|k| normalize_tag_name(k) == normalized) else {
                continue;
            };

            match found.get(*key) {
                Some(existing) if *existing != tag.value => {
                    return Err(FormatError::malformed(
                        *key,
                        format!("conflicting values {existing:?} and {:?}", tag.value),
                    ));
                }
                Some(_) => {}
                None => {
                    found.insert((*key).to_string(), tag.value);
                }
            }
        }

        let mut ordered = TagMap::with_capacity(found.len());
        for key in keys {
            if let Some(value) = found.swap_remove(*key) {
                ordered.insert((*key).to_string(), value);
            }
        }
        Ok(ordered)
    }

    /// Every text tag under its normalised name, in physical order
    ///
    /// No vocabulary filter and no value checks. When two spellings
    /// normalise to the same key, the later one wins.
    ///
    /// # Errors
    /// `UnsupportedFormat`, or any tool or decoding failure
    pub fn read_all(&self, path: &Path) -> Result<TagMap, FormatError> {
        let tool = self.tool()?;
        let mut all = TagMap::new();
        for tag in tool.read_tags(path)? {
            all.insert(normalize_tag_name(&tag.name), tag.value);
        }
        Ok(all)
    }

    /// Digest of the primary content, unaffected by text tags
    ///
    /// # Errors
    /// `UnsupportedFormat` for formats without a content model, or I/O failure
    pub fn content_digest(&self, path: &Path) -> Result<ContentDigest, FormatError> {
        match self.kind {
            FormatKind::Png => {
                let bytes = fs::read(path).map_err(|e| FormatError::io(path, e))?;
                png_content_digest(&bytes)
            }
            other => Err(FormatError::unsupported(other.as_str())),
        }
    }
}

fn normalized_set<'a>(keys: impl Iterator<Item = &'a str>) -> HashSet<String> {
    keys.map(normalize_tag_name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::MockTagTool;
    use mockall::predicate::*;
    use pretty_assertions::assert_eq;

    const KEYS: &[&str] = &["created_at", "user", "commit_id"];

    fn strategy(mock: MockTagTool) -> FormatStrategy {
        FormatStrategy::new(FormatKind::Png, Arc::new(mock))
    }

    fn tags(pairs: &[(&str, &str)]) -> Vec<RawTag> {
        pairs.iter().map(|(n, v)| RawTag::new(*n, *v)).collect()
    }

    /// Mock whose names and named reads are served from `pairs`
    fn stored(pairs: &'static [(&'static str, &'static str)]) -> MockTagTool {
        let mut mock = MockTagTool::new();
        mock.expect_tag_names()
            .returning(move |_| Ok(pairs.iter().map(|(n, _)| (*n).to_string()).collect()));
        mock.expect_read_named().returning(move |_, names| {
            Ok(tags(pairs)
                .into_iter()
                .filter(|t| names.contains(&t.name))
                .collect())
        });
        mock
    }

    #[test]
    fn unimplemented_fails_before_tool() {
        let s = FormatStrategy::unimplemented(FormatKind::Tiff);
        assert!(!s.is_implemented());
        let path = Path::new("/nonexistent.tif");

        for err in [
            s.clear_recognized(path, KEYS).unwrap_err(),
            s.clear_all(path).unwrap_err(),
            s.write(path, &TagMap::new()).unwrap_err(),
            s.read(path, KEYS).unwrap_err(),
            s.read_all(path).unwrap_err(),
        ] {
            assert!(
                matches!(&err, FormatError::UnsupportedFormat { format } if format == "tiff"),
                "{err}"
            );
        }
    }

    #[test]
    fn read_normalises_filters_and_orders() {
        let mock = stored(&[
            ("Commit Id", "abc123"),
            ("Software", "paint"),
            ("CREATED-AT", "2024-01-01T00:00:00+0000"),
        ]);

        let read = strategy(mock).read(Path::new("a.png"), KEYS).unwrap();
        let entries: Vec<(&str, &str)> = read.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            entries,
            vec![
                ("created_at", "2024-01-01T00:00:00+0000"),
                ("commit_id", "abc123"),
            ]
        );
    }

    #[test]
    fn read_conflicting_spellings_is_malformed() {
        let mock = stored(&[("user", "alice"), ("User", "bob")]);

        let err = strategy(mock).read(Path::new("a.png"), KEYS).unwrap_err();
        assert!(matches!(err, FormatError::MalformedMetadata { ref tag, .. } if tag == "user"));
    }

    #[test]
    fn read_agreeing_spellings_collapse() {
        let mock = stored(&[("user", "alice"), ("User", "alice")]);

        let read = strategy(mock).read(Path::new("a.png"), KEYS).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read["user"], "alice");
    }

    #[test]
    fn read_only_decodes_matching_names() {
        let mut mock = MockTagTool::new();
        mock.expect_tag_names()
            .returning(|_| Ok(vec!["XML:com.other".to_string(), "User".to_string()]));
        mock.expect_read_named()
            .with(always(), eq(vec!["User".to_string()]))
            .times(1)
            .returning(|_, _| Ok(tags(&[("User", "alice")])));
        mock.expect_read_tags().never();

        let read = strategy(mock).read(Path::new("a.png"), KEYS).unwrap();
        assert_eq!(read["user"], "alice");
    }

    #[test]
    fn read_without_matches_decodes_nothing() {
        let mut mock = MockTagTool::new();
        mock.expect_tag_names()
            .returning(|_| Ok(vec!["Software".to_string()]));
        mock.expect_read_named().never();

        assert!(strategy(mock)
            .read(Path::new("a.png"), KEYS)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn read_all_normalises_without_filtering() {
        let mut mock = MockTagTool::new();
        mock.expect_read_tags().returning(|_| {
            Ok(tags(&[
                ("Software", "paint"),
                ("Commit Id", "old"),
                ("commit_id", "new"),
            ]))
        });

        let all = strategy(mock).read_all(Path::new("a.png")).unwrap();
        let entries: Vec<(&str, &str)> = all.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("software", "paint"), ("commit_id", "new")]);
    }

    #[test]
    fn clear_recognized_only_deletes_matching_names() {
        let mut mock = stored(&[("User", "x"), ("Software", "y"), ("commit_id", "z")]);
        mock.expect_delete_tags()
            .with(always(), eq(vec!["User".to_string(), "commit_id".to_string()]))
            .times(1)
            .returning(|_, names| Ok(names.len()));
        mock.expect_name().return_const("mock");

        let removed = strategy(mock)
            .clear_recognized(Path::new("a.png"), KEYS)
            .unwrap();
        assert_eq!(removed, 2);
    }

    #[test]
    fn clear_recognized_without_matches_skips_delete() {
        let mut mock = stored(&[("Software", "y")]);
        mock.expect_delete_tags().never();

        let removed = strategy(mock)
            .clear_recognized(Path::new("a.png"), KEYS)
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn write_removes_other_spellings_first() {
        let mut mock = MockTagTool::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_tag_names()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec!["Commit Id".to_string(), "commit_id".to_string()]));
        mock.expect_delete_tags()
            .with(always(), eq(vec!["Commit Id".to_string()]))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(1));
        mock.expect_write_tags()
            .withf(|_, raw| raw == [RawTag::new("commit_id", "new")])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock.expect_name().return_const("mock");

        let mut map = TagMap::new();
        map.insert("commit_id".into(), "new".into());
        strategy(mock).write(Path::new("a.png"), &map).unwrap();
    }

    #[test]
    fn tool_errors_propagate() {
        let mut mock = MockTagTool::new();
        mock.expect_tag_names().returning(|_| {
            Err(FormatError::ToolInvocationFailed {
                tool: "mock".into(),
                operation: crate::error::ToolOperation::Read,
                exit_code: Some(1),
                detail: "boom".into(),
            })
        });

        let err = strategy(mock).read(Path::new("a.png"), KEYS).unwrap_err();
        assert!(matches!(err, FormatError::ToolInvocationFailed { .. }));
    }

    #[test]
    fn digest_is_png_only() {
        let s = FormatStrategy::unimplemented(FormatKind::Pdf);
        assert!(matches!(
            s.content_digest(Path::new("a.pdf")),
            Err(FormatError::UnsupportedFormat { .. })
        ));
    }
}

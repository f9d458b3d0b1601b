//! Both PNG backends through the public strategy API
//!
//! The exiftool half is skipped when no `exiftool` binary is installed.

use pretty_assertions::assert_eq;
use provstamp_format::{
    ExifTool, FormatAdapter, FormatKind, FormatRegistry, FormatStrategy, PngTextTool, TagMap,
    TagTool,
};
use provstamp_test_utils::{minimal_png, png_with_text, write_artifact};
use std::fs;
use std::process::Command;
use std::sync::Arc;

const KEYS: &[&str] = &["created_at", "user", "commit_id"];

fn exiftool_available() -> bool {
    Command::new("exiftool")
        .arg("-ver")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn record() -> TagMap {
    let mut tags = TagMap::new();
    tags.insert("created_at".into(), "2024-01-01T00:00:00+0000".into());
    tags.insert("user".into(), "alice".into());
    tags.insert("commit_id".into(), "abc123".into());
    tags
}

fn exercise(strategy: &FormatStrategy) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_artifact(dir.path(), "plot.png", &png_with_text(&[("Software", "plotter")]));
    let digest = strategy.content_digest(&path).unwrap();

    strategy.clear_recognized(&path, KEYS).unwrap();
    strategy.write(&path, &record()).unwrap();
    assert_eq!(strategy.read(&path, KEYS).unwrap(), record());

    // Second write leaves the same tag set.
    strategy.write(&path, &record()).unwrap();
    assert_eq!(strategy.read(&path, KEYS).unwrap(), record());

    assert_eq!(strategy.clear_recognized(&path, KEYS).unwrap(), KEYS.len());
    assert!(strategy.read(&path, KEYS).unwrap().is_empty());

    let software = strategy
        .tool()
        .unwrap()
        .read_tags(&path)
        .unwrap()
        .into_iter()
        .any(|t| t.name.eq_ignore_ascii_case("software") && t.value == "plotter");
    assert!(software, "foreign tag lost");

    assert_eq!(strategy.content_digest(&path).unwrap(), digest);
    assert!(!dir.path().join("plot.png_original").exists());
}

#[test]
fn native_backend() {
    exercise(&FormatStrategy::new(FormatKind::Png, Arc::new(PngTextTool::new())));
}

#[test]
fn exiftool_backend() {
    if !exiftool_available() {
        eprintln!("exiftool not installed; skipping");
        return;
    }
    exercise(&FormatStrategy::new(FormatKind::Png, Arc::new(ExifTool::new())));
}

#[test]
fn native_write_is_readable_by_exiftool_registry() {
    if !exiftool_available() {
        eprintln!("exiftool not installed; skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let path = write_artifact(dir.path(), "plot.png", &minimal_png());

    FormatAdapter::default().write(&path, &record()).unwrap();

    let exif = FormatAdapter::new(Arc::new(FormatRegistry::with_png_tool(Arc::new(
        ExifTool::new(),
    ))));
    assert_eq!(exif.read(&path, KEYS).unwrap(), record());
}

#[test]
fn native_write_preserves_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let original = minimal_png();
    let path = write_artifact(dir.path(), "plot.png", &original);
    let adapter = FormatAdapter::default();

    adapter.write(&path, &record()).unwrap();
    assert_ne!(fs::read(&path).unwrap(), original);

    adapter.clear_all(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), original);
}

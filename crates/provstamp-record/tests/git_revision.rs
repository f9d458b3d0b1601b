//! Revision lookup against a real git repository.
//!
//! Skipped silently when no `git` binary is available.

use provstamp_record::{GitCli, RevisionError, RevisionSource};
use std::path::Path;
use std::process::Command;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["-c", "user.name=Test Author", "-c", "user.email=test@example.com"])
        .args(args)
        .env("GIT_AUTHOR_DATE", "2024-01-01T00:00:00+00:00")
        .env("GIT_COMMITTER_DATE", "2024-01-01T00:00:00+00:00")
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

#[test]
fn locates_repository_and_commit() {
    if !git_available() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "init"]);

    let info = GitCli::new().locate(dir.path(), false).unwrap();

    assert_eq!(
        info.root.canonicalize().unwrap(),
        dir.path().canonicalize().unwrap()
    );
    assert_eq!(info.author, "Test Author");
    assert_eq!(info.commit_id.len(), 40);
    assert!(info.commit_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(info.commit_time.timestamp(), 1_704_067_200);
}

#[test]
fn subdirectory_needs_ancestor_search() {
    if !git_available() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "init"]);
    let sub = dir.path().join("figures");
    std::fs::create_dir(&sub).unwrap();

    let git = GitCli::new();
    assert!(matches!(
        git.locate(&sub, false),
        Err(RevisionError::NotFound { .. })
    ));
    assert!(git.locate(&sub, true).is_ok());
}

#[test]
fn plain_directory_is_not_found() {
    if !git_available() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let err = GitCli::new().locate(dir.path(), false).unwrap_err();
    assert!(matches!(err, RevisionError::NotFound { .. }));
}

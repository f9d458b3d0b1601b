//! Revision source collaborator
//!
//! A [`RevisionSource`] reports which commit a working tree is at. The
//! bundled [`GitCli`] asks the `git` binary; tests inject fixed sources.

use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Repository state at stamping time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Repository root (top of the working tree)
    pub root: PathBuf,
    /// Current commit identifier
    pub commit_id: String,
    /// Commit author name
    pub author: String,
    /// Commit author timestamp
    pub commit_time: DateTime<FixedOffset>,
}

/// Locates the repository a path belongs to
#[cfg_attr(test, mockall::automock)]
pub trait RevisionSource: Send + Sync {
    /// Resolve repository state for `path`
    ///
    /// With `search_ancestors` unset, `path` itself must be the repository
    /// root.
    ///
    /// # Errors
    /// [`RevisionError::NotFound`] when no repository exists there
    fn locate(&self, path: &Path, search_ancestors: bool) -> Result<RepoInfo, RevisionError>;
}

/// Revision lookup errors
#[derive(Debug, thiserror::Error)]
pub enum RevisionError {
    /// No repository at (or above) the path
    #[error("no repository found at {}", .path.display())]
    NotFound { path: PathBuf },

    /// Repository exists but its state could not be read
    #[error("repository state unavailable: {0}")]
    Unavailable(String),
}

/// [`RevisionSource`] backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Use `git` from `PATH`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }

    /// Use a specific git binary
    #[inline]
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Result<String, RevisionError> {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .map_err(|e| RevisionError::Unavailable(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RevisionError::Unavailable(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionSource for GitCli {
    fn locate(&self, path: &Path, search_ancestors: bool) -> Result<RepoInfo, RevisionError> {
        let not_found = || RevisionError::NotFound {
            path: path.to_path_buf(),
        };

        if !path.is_dir() {
            return Err(not_found());
        }

        let root = match self.git(path, &["rev-parse", "--show-toplevel"]) {
            Ok(root) => PathBuf::from(root),
            Err(_) => return Err(not_found()),
        };

        if !search_ancestors {
            let requested = path.canonicalize().map_err(|_| not_found())?;
            let found = root.canonicalize().map_err(|_| not_found())?;
            if requested != found {
                return Err(not_found());
            }
        }

        let line = self.git(&root, &["log", "-1", "--format=%H%x00%an%x00%aI"])?;
        parse_log_line(root, &line)
    }
}

/// Parse `%H\0%an\0%aI` output
fn parse_log_line(root: PathBuf, line: &str) -> Result<RepoInfo, RevisionError> {
    let mut parts = line.split('\0');
    let (Some(hash), Some(author), Some(time)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RevisionError::Unavailable(format!(
            "unexpected git log output: {line:?}"
        )));
    };

    let commit_time = DateTime::parse_from_rfc3339(time.trim())
        .map_err(|e| RevisionError::Unavailable(format!("bad commit time {time:?}: {e}")))?;

    Ok(RepoInfo {
        root,
        commit_id: hash.trim().to_ascii_lowercase(),
        author: author.to_string(),
        commit_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_line_ok() {
        let info = parse_log_line(
            PathBuf::from("/repo"),
            "ABC123\0Ada Lovelace\02024-01-01T00:00:00+00:00",
        )
        .unwrap();

        assert_eq!(info.commit_id, "abc123");
        assert_eq!(info.author, "Ada Lovelace");
        assert_eq!(info.root, PathBuf::from("/repo"));
        assert_eq!(info.commit_time.timestamp(), 1_704_067_200);
    }

    #[test]
    fn parse_log_line_truncated() {
        let err = parse_log_line(PathBuf::from("/repo"), "abc123").unwrap_err();
        assert!(matches!(err, RevisionError::Unavailable(_)));
    }

    #[test]
    fn parse_log_line_bad_time() {
        let err = parse_log_line(PathBuf::from("/repo"), "abc\0a\0yesterday").unwrap_err();
        assert!(err.to_string().contains("bad commit time"));
    }

    #[test]
    fn git_cli_missing_directory_is_not_found() {
        let git = GitCli::new();
        let err = git
            .locate(Path::new("/definitely/not/a/dir"), true)
            .unwrap_err();
        assert!(matches!(err, RevisionError::NotFound { .. }));
    }

    #[test]
    fn git_cli_missing_binary_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::with_program("/nonexistent/git-binary");
        let err = git.locate(dir.path(), false).unwrap_err();
        assert!(matches!(err, RevisionError::NotFound { .. }));
    }
}

//! External `exiftool` backend
//!
//! Every call is one isolated exiftool process with a generated
//! user-defined-tag config, a timeout, and no shell. Backup files exiftool
//! may leave next to the artifact are removed after each edit.

use crate::error::{FormatError, ToolOperation};
use crate::process::{run_with_timeout, RunError};
use crate::tool::{RawTag, TagTool};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TOOL_NAME: &str = "exiftool";

/// [`TagTool`] that shells out to exiftool for PNG text tags
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    timeout: Duration,
}

impl ExifTool {
    /// Use `exiftool` from `PATH` with the default timeout
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(TOOL_NAME),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a specific exiftool binary
    #[inline]
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured program
    #[inline]
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Configured timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn failed(operation: ToolOperation, exit_code: Option<i32>, detail: impl Into<String>) -> FormatError {
        FormatError::ToolInvocationFailed {
            tool: TOOL_NAME.to_string(),
            operation,
            exit_code,
            detail: detail.into(),
        }
    }

    fn run(
        &self,
        operation: ToolOperation,
        config: Option<&Path>,
        args: Vec<OsString>,
    ) -> Result<Vec<u8>, FormatError> {
        let mut command = Command::new(&self.program);
        if let Some(config) = config {
            // -config must come first.
            command.arg("-config").arg(config);
        }
        command.args(args);

        tracing::debug!("Running {} {}", self.program.display(), operation);

        let output = run_with_timeout(&mut command, self.timeout).map_err(|e| {
            if let RunError::TimedOut(limit) = e {
                tracing::warn!("{} timed out after {:?}", TOOL_NAME, limit);
            }
            Self::failed(operation, None, e.to_string())
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Self::failed(operation, output.status.code(), stderr));
        }

        Ok(output.stdout)
    }

    /// Absolute path, so a leading `-` is never read as an option
    fn target(path: &Path) -> Result<PathBuf, FormatError> {
        path.canonicalize().map_err(|e| FormatError::io(path, e))
    }

    /// Remove `<file>_original` left by exiftool
    fn cleanup_backup(path: &Path) -> Result<(), FormatError> {
        let mut backup = path.as_os_str().to_owned();
        backup.push("_original");
        let backup = PathBuf::from(backup);

        if backup.exists() {
            fs::remove_file(&backup).map_err(|e| FormatError::io(&backup, e))?;
            tracing::debug!("Removed exiftool backup {}", backup.display());
        }
        Ok(())
    }

    fn edit(
        &self,
        operation: ToolOperation,
        path: &Path,
        names: &[&str],
        assignments: Vec<OsString>,
    ) -> Result<(), FormatError> {
        let target = Self::target(path)?;
        let config = write_config(names)?;

        let mut args: Vec<OsString> = vec!["-overwrite_original".into(), "-m".into()];
        args.extend(assignments);
        args.push(target.clone().into_os_string());

        let result = self.run(operation, Some(config.path()), args);
        let cleanup = Self::cleanup_backup(&target);
        result?;
        cleanup
    }

    /// Delete every tag in `names`
    fn remove(&self, operation: ToolOperation, path: &Path, names: &[String]) -> Result<(), FormatError> {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let assignments = names.iter().copied().map(deletion).collect();
        self.edit(operation, path, &names, assignments)
    }
}

/// `-PNG:name=value`; an empty value uses `^=` since a bare `=` deletes
fn assignment(name: &str, value: &str) -> OsString {
    if value.is_empty() {
        OsString::from(format!("-PNG:{name}^="))
    } else {
        OsString::from(format!("-PNG:{name}={value}"))
    }
}

fn deletion(name: &str) -> OsString {
    OsString::from(format!("-PNG:{name}="))
}

impl Default for ExifTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Names exiftool can carry as user-defined PNG text tags
fn check_name(name: &str) -> Result<(), FormatError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(FormatError::malformed(
            name,
            "tag name not representable as an exiftool user-defined tag",
        ))
    }
}

/// Perl config declaring `names` as writable PNG textual tags
fn render_config(names: &[&str]) -> Result<String, FormatError> {
    let mut out = String::from(
        "%Image::ExifTool::UserDefined = (\n    'Image::ExifTool::PNG::TextualData' => {\n",
    );
    for name in names {
        check_name(name)?;
        out.push_str(&format!("        '{name}' => {{ }},\n"));
    }
    out.push_str("    },\n);\n1;\n");
    Ok(out)
}

fn write_config(names: &[&str]) -> Result<NamedTempFile, FormatError> {
    let body = render_config(names)?;
    let mut file = NamedTempFile::new().map_err(|e| FormatError::io(std::env::temp_dir(), e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| FormatError::io(file.path(), e))?;
    Ok(file)
}

/// Family-1 groups exiftool reports PNG text chunks under
const TEXT_GROUPS: [&str; 3] = ["PNG-tEXt", "PNG-iTXt", "PNG-zTXt"];

/// Parse `exiftool -json -G1` output for one file, keeping text tags only
fn parse_json(stdout: &[u8]) -> Result<Vec<RawTag>, FormatError> {
    let files: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_slice(stdout)
        .map_err(|e| FormatError::malformed(TOOL_NAME, format!("unreadable JSON output: {e}")))?;

    let Some(file) = files.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(file
        .into_iter()
        .filter_map(|(key, value)| {
            let (group, name) = key.split_once(':')?;
            if !TEXT_GROUPS.contains(&group) {
                return None;
            }
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some(RawTag::new(name, value))
        })
        .collect())
}

impl TagTool for ExifTool {
    fn name(&self) -> &'static str {
        TOOL_NAME
    }

    fn read_tags(&self, path: &Path) -> Result<Vec<RawTag>, FormatError> {
        let target = Self::target(path)?;
        let stdout = self.run(
            ToolOperation::Read,
            None,
            vec![
                "-json".into(),
                "-s".into(),
                "-G1".into(),
                "-PNG:all".into(),
                target.into_os_string(),
            ],
        )?;
        parse_json(&stdout)
    }

    fn write_tags(&self, path: &Path, tags: &[RawTag]) -> Result<(), FormatError> {
        if tags.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        let assignments = tags.iter().map(|t| assignment(&t.name, &t.value)).collect();
        self.edit(ToolOperation::Write, path, &names, assignments)
    }

    fn delete_tags(&self, path: &Path, names: &[String]) -> Result<usize, FormatError> {
        let present: Vec<String> = self
            .read_tags(path)?
            .into_iter()
            .map(|t| t.name)
            .filter(|n| names.contains(n))
            .collect();
        if present.is_empty() {
            return Ok(0);
        }

        self.remove(ToolOperation::Delete, path, &present)?;
        Ok(present.len())
    }

    fn delete_all(&self, path: &Path) -> Result<usize, FormatError> {
        let names: Vec<String> = self.read_tags(path)?.into_iter().map(|t| t.name).collect();
        if names.is_empty() {
            return Ok(0);
        }
        self.remove(ToolOperation::Wipe, path, &names)?;
        Ok(names.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provstamp_test_utils::{minimal_png, write_artifact};

    #[test]
    fn config_declares_each_name() {
        let config = render_config(&["created_at", "commit_id"]).unwrap();
        assert!(config.starts_with("%Image::ExifTool::UserDefined"));
        assert!(config.contains("'created_at' => { },"));
        assert!(config.contains("'commit_id' => { },"));
        assert!(config.trim_end().ends_with("1;"));
    }

    #[test]
    fn config_rejects_quote_injection() {
        let err = render_config(&["x' => 1, 'y"]).unwrap_err();
        assert!(matches!(err, FormatError::MalformedMetadata { .. }));
    }

    #[test]
    fn parse_json_keeps_text_groups_only() {
        let out = br#"[{"SourceFile":"/a.png","PNG:ImageWidth":1,"PNG:BitDepth":8,"PNG-tEXt:Commit_id":"abc123","PNG-iTXt:User":"alice","PNG-zTXt:Comment":"z","System:FileSize":"1 kB"}]"#;
        let mut tags = parse_json(out).unwrap();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            tags,
            vec![
                RawTag::new("Comment", "z"),
                RawTag::new("Commit_id", "abc123"),
                RawTag::new("User", "alice"),
            ]
        );
    }

    #[test]
    fn empty_value_is_assigned_not_deleted() {
        assert_eq!(assignment("repo_root", ""), OsString::from("-PNG:repo_root^="));
        assert_eq!(assignment("user", "alice"), OsString::from("-PNG:user=alice"));
        assert_eq!(deletion("user"), OsString::from("-PNG:user="));
    }

    #[test]
    fn parse_json_garbage_is_malformed() {
        assert!(matches!(
            parse_json(b"not json"),
            Err(FormatError::MalformedMetadata { .. })
        ));
        assert!(parse_json(b"[]").unwrap().is_empty());
    }

    #[test]
    fn missing_binary_is_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "a.png", &minimal_png());
        let tool = ExifTool::new().with_program("/nonexistent/exiftool");

        let err = tool.read_tags(&path).unwrap_err();
        assert!(matches!(
            err,
            FormatError::ToolInvocationFailed {
                operation: ToolOperation::Read,
                exit_code: None,
                ..
            }
        ));
    }

    #[test]
    fn backup_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), "a.png", &minimal_png());
        let backup = dir.path().join("a.png_original");
        fs::write(&backup, b"old").unwrap();

        ExifTool::cleanup_backup(&path).unwrap();
        assert!(!backup.exists());
        assert!(path.exists());
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-exiftool");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn non_zero_exit_carries_code_and_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            let program = script(dir.path(), "echo 'Error: nope' >&2; exit 2");

            let err = ExifTool::new()
                .with_program(program)
                .write_tags(&artifact, &[RawTag::new("user", "alice")])
                .unwrap_err();

            match err {
                FormatError::ToolInvocationFailed {
                    operation,
                    exit_code,
                    detail,
                    ..
                } => {
                    assert_eq!(operation, ToolOperation::Write);
                    assert_eq!(exit_code, Some(2));
                    assert_eq!(detail, "Error: nope");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn hanging_tool_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            let program = script(dir.path(), "sleep 5");

            let err = ExifTool::new()
                .with_program(program)
                .with_timeout(Duration::from_millis(200))
                .read_tags(&artifact)
                .unwrap_err();

            assert!(err.to_string().contains("timed out"));
        }

        #[test]
        fn write_passes_assignments_and_cleans_backup() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            let log = dir.path().join("args.log");
            // Record arguments, then mimic exiftool leaving a backup behind.
            let program = script(
                dir.path(),
                &format!(
                    "for a in \"$@\"; do echo \"$a\" >> '{}'; done\nlast=\"\"; for a in \"$@\"; do last=\"$a\"; done\ncp \"$last\" \"${{last}}_original\"",
                    log.display()
                ),
            );

            ExifTool::new()
                .with_program(program)
                .write_tags(&artifact, &[RawTag::new("commit_id", "abc123")])
                .unwrap();

            let args = fs::read_to_string(&log).unwrap();
            let args: Vec<&str> = args.lines().collect();
            assert_eq!(args[0], "-config");
            assert!(args.contains(&"-overwrite_original"));
            assert!(args.contains(&"-PNG:commit_id=abc123"));
            assert!(!dir.path().join("a.png_original").exists());
        }

        #[test]
        fn empty_values_use_empty_string_syntax() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            let log = dir.path().join("args.log");
            let program = script(
                dir.path(),
                &format!("for a in \"$@\"; do echo \"$a\" >> '{}'; done", log.display()),
            );

            ExifTool::new()
                .with_program(program)
                .write_tags(
                    &artifact,
                    &[RawTag::new("repo_root", ""), RawTag::new("user", "alice")],
                )
                .unwrap();

            let args = fs::read_to_string(&log).unwrap();
            let args: Vec<&str> = args.lines().collect();
            assert!(args.contains(&"-PNG:repo_root^="), "{args:?}");
            assert!(!args.contains(&"-PNG:repo_root="), "{args:?}");
            assert!(args.contains(&"-PNG:user=alice"), "{args:?}");
        }

        #[test]
        fn delete_reads_text_groups_and_clears_with_bare_assignment() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            let log = dir.path().join("args.log");
            // Answer reads with JSON, log the arguments of edits.
            let program = script(
                dir.path(),
                &format!(
                    "case \"$1\" in\n-json) echo '[{{\"SourceFile\":\"a.png\",\"PNG:ImageWidth\":1,\"PNG-tEXt:User\":\"alice\"}}]' ;;\n*) for a in \"$@\"; do echo \"$a\" >> '{}'; done ;;\nesac",
                    log.display()
                ),
            );

            let removed = ExifTool::new()
                .with_program(program)
                .delete_all(&artifact)
                .unwrap();

            assert_eq!(removed, 1);
            let args = fs::read_to_string(&log).unwrap();
            let args: Vec<&str> = args.lines().collect();
            assert!(args.contains(&"-PNG:User="), "{args:?}");
            assert!(!args.iter().any(|a| a.contains("ImageWidth")), "{args:?}");
        }

        #[test]
        fn tool_failure_wins_over_cleanup_failure() {
            let dir = tempfile::tempdir().unwrap();
            let artifact = write_artifact(dir.path(), "a.png", &minimal_png());
            // A directory in place of the backup makes remove_file fail.
            let program = script(
                dir.path(),
                "last=\"\"; for a in \"$@\"; do last=\"$a\"; done\nmkdir \"${last}_original\"\necho 'Error: nope' >&2; exit 1",
            );

            let err = ExifTool::new()
                .with_program(program)
                .write_tags(&artifact, &[RawTag::new("user", "alice")])
                .unwrap_err();
            assert!(
                matches!(err, FormatError::ToolInvocationFailed { exit_code: Some(1), .. }),
                "{err}"
            );
        }
    }
}

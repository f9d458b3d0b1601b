//! Host context for record assembly
//!
//! Everything the assembler would otherwise read from process globals
//! (clock, user, host, calling program) is captured into a
//! [`RecordContext`] by a [`ContextSource`], so assembly stays pure.

use chrono::{DateTime, FixedOffset, Local};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Snapshot of the host environment for one assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordContext {
    /// Wall-clock time
    pub now: DateTime<FixedOffset>,
    /// Invoking user
    pub user: Option<String>,
    /// Host/platform descriptor
    pub host: String,
    /// Caller-identifying path
    pub caller: Option<PathBuf>,
    /// Working directory of the process, used when no repo path is given
    pub working_dir: PathBuf,
}

/// Produces a [`RecordContext`] per assembly
pub trait ContextSource: Send + Sync {
    /// Capture the current context
    fn capture(&self) -> RecordContext;
}

/// Context read from the live process environment
#[derive(Debug, Clone, Default)]
pub struct SystemContext {
    caller: Option<PathBuf>,
}

impl SystemContext {
    /// Detect everything from the environment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `caller` instead of detecting the calling program
    #[inline]
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<PathBuf>) -> Self {
        self.caller = Some(caller.into());
        self
    }
}

impl ContextSource for SystemContext {
    fn capture(&self) -> RecordContext {
        let working_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let caller = self
            .caller
            .clone()
            .or_else(|| detect_caller(&working_dir));

        RecordContext {
            now: Local::now().fixed_offset(),
            user: detect_user(),
            host: host_descriptor(),
            caller,
            working_dir,
        }
    }
}

/// Context that always returns the same snapshot
#[derive(Debug, Clone)]
pub struct FixedContext(pub RecordContext);

impl ContextSource for FixedContext {
    fn capture(&self) -> RecordContext {
        self.0.clone()
    }
}

fn detect_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// `"<hostname> <os> <arch>"`
#[must_use]
pub fn host_descriptor() -> String {
    let hostname = detect_hostname().unwrap_or_else(|| "unknown".to_string());
    format!("{hostname} {} {}", env::consts::OS, env::consts::ARCH)
}

fn detect_hostname() -> Option<String> {
    if let Some(name) = env::var("HOSTNAME").ok().filter(|v| !v.trim().is_empty()) {
        return Some(name.trim().to_string());
    }

    if let Some(name) = fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return Some(name);
    }

    let output = Command::new("hostname")
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let hostname = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if hostname.is_empty() {
        None
    } else {
        Some(hostname)
    }
}

/// Path of the running program when it lives under `working_dir`
///
/// Best effort: `None` when it cannot be determined or lies elsewhere.
fn detect_caller(working_dir: &Path) -> Option<PathBuf> {
    let root = working_dir.canonicalize().ok()?;

    let candidates = [
        env::args_os().next().map(|arg| working_dir.join(arg)),
        env::current_exe().ok(),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(|path| path.canonicalize().ok())
        .find(|path| path.starts_with(&root))
}

//! Bounded external process execution

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Captured result of a finished process
#[derive(Debug)]
pub(crate) struct ProcessOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Why a process produced no output
#[derive(Debug, thiserror::Error)]
pub(crate) enum RunError {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed to wait: {0}")]
    Wait(#[source] io::Error),

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    #[error("failed to read output: {0}")]
    Read(#[source] io::Error),
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut pipe) => {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let result = pipe.read_to_end(&mut buf).map(|_| buf);
                let _ = tx.send(result);
            });
        }
        None => {
            let _ = tx.send(Ok(Vec::new()));
        }
    }
    rx
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Run `command` to completion, killing it after `timeout`
///
/// Output pipes are drained on reader threads while waiting so a chatty
/// process cannot block on a full pipe.
pub(crate) fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> Result<ProcessOutput, RunError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(RunError::Spawn)?;

    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            reap(&mut child);
            return Err(RunError::TimedOut(timeout));
        }
        Err(e) => {
            reap(&mut child);
            return Err(RunError::Wait(e));
        }
    };

    let collect = |rx: mpsc::Receiver<io::Result<Vec<u8>>>| -> Result<Vec<u8>, RunError> {
        rx.recv()
            .map_err(|_| RunError::Read(io::Error::new(io::ErrorKind::BrokenPipe, "reader thread exited")))?
            .map_err(RunError::Read)
    };

    Ok(ProcessOutput {
        status,
        stdout: collect(stdout_rx)?,
        stderr: collect(stderr_rx)?,
    })
}

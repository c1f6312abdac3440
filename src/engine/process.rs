// src/engine/process.rs

//! Process runner: one interpreter, one child process, one outcome.
//!
//! The interpreter is invoked as `<interpreter> -u -c <source>`, so the
//! snippet is evaluated as a script body and never touches the filesystem.
//! `-u` keeps the child's output unbuffered so anything printed before a
//! timeout is still captured.
//!
//! stdout and stderr are drained into two independent buffers while the
//! process is awaited and the deadline ticks, all inside one `select!` loop.
//! No thread ever blocks on the child.
//!
//! Each stream keeps at most `max_output` bytes. Past that the pipe is still
//! read so the child never blocks on a full pipe, but the bytes are dropped
//! and a truncation marker is appended once the run settles.
//!
//! On deadline expiry the child gets SIGTERM and the outcome is finalized at
//! once. A process that ignores SIGTERM may outlive the reported timeout;
//! a detached reaper force-kills it after the configured grace period.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::engine::error::LaunchError;
use crate::engine::settle::Settlement;
use crate::engine::ExecutionOutcome;
use crate::metrics::{MemoryTracker, RunMetrics};

/// Appended to stderr when the deadline fires.
pub const TIMEOUT_MARKER: &str = "Execution timed out.";

/// Appended to a stream that hit the output cap.
pub const TRUNCATION_MARKER: &str = "[output truncated]";

/// Exit code reported for a run stopped by the deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 1;

const READ_CHUNK: usize = 8 * 1024;
const MEMORY_SAMPLE_EVERY: Duration = Duration::from_millis(20);

/// Per-run limits, copied out of the configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub timeout: Duration,
    pub kill_grace: Option<Duration>,
    /// Per-stream cap on captured bytes.
    pub max_output: usize,
}

/// Result of one attempt with one interpreter.
#[derive(Debug)]
pub enum Attempt {
    /// The interpreter launched; whatever the snippet did is in here.
    Completed(ExecutionOutcome),
    /// The interpreter never got going. Try the next candidate.
    LaunchFailed(LaunchError),
}

/// Output buffer that stops growing at `cap` bytes.
#[derive(Debug)]
struct CappedBuffer {
    bytes: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBuffer {
    fn new(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.cap.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn into_string(self) -> String {
        let mut s = decode(self.bytes);
        if self.truncated {
            append_marker(&mut s, TRUNCATION_MARKER);
        }
        s
    }
}

enum Ending {
    Closed(ExitStatus),
    TimedOut,
    Errored(std::io::Error),
}

/// Run `source` with `interpreter` under `limits`.
pub async fn run_candidate(interpreter: &str, source: &str, limits: RunLimits) -> Attempt {
    // The select loop below already ends exactly once; the settlement only
    // records the lifecycle so the transitions are explicit.
    let settlement = Settlement::new();

    let mut cmd = Command::new(interpreter);
    cmd.arg("-u")
        .arg("-c")
        .arg(source)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            settlement.settle();
            return Attempt::LaunchFailed(LaunchError::Spawn {
                interpreter: interpreter.to_string(),
                source,
            });
        }
    };

    settlement.start();
    let started = Instant::now();
    let deadline = tokio::time::sleep(limits.timeout);
    tokio::pin!(deadline);

    let pid = child.id();
    let tracker = pid.map(|pid| MemoryTracker::start(pid, MEMORY_SAMPLE_EVERY));
    tracing::debug!(interpreter, pid, "interpreter launched");

    let (mut out, mut err) = match (child.stdout.take(), child.stderr.take()) {
        (Some(out), Some(err)) => (out, err),
        (out, _) => {
            let _ = child.start_kill();
            settlement.settle();
            return Attempt::LaunchFailed(LaunchError::MissingPipe {
                interpreter: interpreter.to_string(),
                stream: if out.is_none() { "stdout" } else { "stderr" },
            });
        }
    };

    let mut stdout = CappedBuffer::new(limits.max_output);
    let mut stderr = CappedBuffer::new(limits.max_output);
    let mut out_chunk = vec![0u8; READ_CHUNK];
    let mut err_chunk = vec![0u8; READ_CHUNK];
    let mut out_open = true;
    let mut err_open = true;
    let mut status: Option<ExitStatus> = None;

    // "close" means: exited and both pipes drained.
    let ending = loop {
        if let (Some(s), false, false) = (status, out_open, err_open) {
            break Ending::Closed(s);
        }

        tokio::select! {
            read = out.read(&mut out_chunk), if out_open => match read {
                Ok(0) => out_open = false,
                Ok(n) => stdout.push(&out_chunk[..n]),
                Err(e) => {
                    tracing::debug!(error = %e, "stdout read failed");
                    out_open = false;
                }
            },
            read = err.read(&mut err_chunk), if err_open => match read {
                Ok(0) => err_open = false,
                Ok(n) => stderr.push(&err_chunk[..n]),
                Err(e) => {
                    tracing::debug!(error = %e, "stderr read failed");
                    err_open = false;
                }
            },
            waited = child.wait(), if status.is_none() => match waited {
                Ok(s) => status = Some(s),
                Err(e) => break Ending::Errored(e),
            },
            () = &mut deadline => break Ending::TimedOut,
        }
    };

    settlement.settle();

    drop(out);
    drop(err);

    let metrics = RunMetrics {
        duration_ms: started.elapsed().as_millis(),
        max_rss_kb: tracker.and_then(MemoryTracker::stop_and_take),
    };

    match ending {
        Ending::Closed(status) => {
            let outcome = ExecutionOutcome {
                stdout: stdout.into_string(),
                stderr: stderr.into_string(),
                // A signal-terminated child has no numeric code.
                exit_code: status.code().unwrap_or(0),
                timed_out: false,
            };
            log_completion(interpreter, &outcome, &metrics);
            Attempt::Completed(outcome)
        }
        Ending::TimedOut => {
            terminate(&mut child);
            reap(child, limits.kill_grace, interpreter.to_string());

            let mut stderr = stderr.into_string();
            append_timeout_marker(&mut stderr);
            let outcome = ExecutionOutcome {
                stdout: stdout.into_string(),
                stderr,
                exit_code: TIMEOUT_EXIT_CODE,
                timed_out: true,
            };
            log_completion(interpreter, &outcome, &metrics);
            Attempt::Completed(outcome)
        }
        Ending::Errored(source) => {
            let _ = child.start_kill();
            Attempt::LaunchFailed(LaunchError::Supervision {
                interpreter: interpreter.to_string(),
                source,
            })
        }
    }
}

/// Append the timeout marker, separated by a newline only when stderr
/// already has content.
pub fn append_timeout_marker(stderr: &mut String) {
    append_marker(stderr, TIMEOUT_MARKER);
}

fn append_marker(stream: &mut String, marker: &str) {
    if !stream.is_empty() {
        stream.push('\n');
    }
    stream.push_str(marker);
}

// Chunks may split a multi-byte sequence, so decode once at the end.
fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn log_completion(interpreter: &str, outcome: &ExecutionOutcome, metrics: &RunMetrics) {
    tracing::info!(
        interpreter,
        exit_code = outcome.exit_code,
        timed_out = outcome.timed_out,
        duration_ms = metrics.duration_ms as u64,
        max_rss_kb = metrics.max_rss_kb,
        "interpreter run settled"
    );
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            tracing::debug!(pid, error = %e, "SIGTERM not delivered");
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.start_kill();
}

/// Wait for a timed-out child in the background, escalating to a forced
/// kill once `grace` elapses.
fn reap(mut child: Child, grace: Option<Duration>, interpreter: String) {
    tokio::spawn(async move {
        let Some(grace) = grace else {
            let _ = child.wait().await;
            return;
        };

        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            tracing::warn!(
                interpreter = %interpreter,
                grace_ms = grace.as_millis() as u64,
                "interpreter ignored SIGTERM, killing"
            );
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    });
}

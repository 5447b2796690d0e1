//! Subprocess-per-invocation backend
//!
//! Each job runs in a fresh interpreter, so the library's games-root global
//! and its module cache start clean every time and die with the worker. The
//! job goes to the worker as JSON on stdin; the worker answers with one JSON
//! report line on stdout. The worker leads its own process group, and the
//! whole group is killed once the job ends or is abandoned.

use crate::backend::PipelineBackend;
use crate::job::{LoadContext, PipelineJob};
use crate::result::{FailureKind, PipelineFailure};
use serde::Deserialize;
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Driver script run by the default interpreter backend
pub const DRIVER_SOURCE: &str = include_str!("../driver/pipeline_driver.py");

/// Environment variable holding the interpreter's module search path
pub const SEARCH_PATH_VAR: &str = "PYTHONPATH";

const STDERR_TAIL_BYTES: usize = 64 * 1024;

/// Ordered module search path handed to a worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    entries: VecDeque<PathBuf>,
}

impl SearchPath {
    /// Search path inherited from this process's environment
    #[must_use]
    pub fn inherited() -> Self {
        std::env::var_os(SEARCH_PATH_VAR)
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    /// Parse a platform path list
    #[must_use]
    pub fn parse(raw: &OsStr) -> Self {
        Self {
            entries: std::env::split_paths(raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
        }
    }

    /// Put `path` in front of every existing entry
    pub fn push_front(&mut self, path: impl Into<PathBuf>) {
        self.entries.push_front(path.into());
    }

    /// Entries in lookup order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Render as a platform path list
    ///
    /// # Errors
    /// An entry contains the platform separator
    pub fn to_os_string(&self) -> Result<OsString, std::env::JoinPathsError> {
        std::env::join_paths(&self.entries)
    }
}

/// Runs each job in its own worker process
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    program: OsString,
    args: Vec<OsString>,
    library_dir: PathBuf,
    inherited: SearchPath,
}

impl SubprocessBackend {
    /// Run the bundled driver with `interpreter` against the SDK in `library_dir`
    #[must_use]
    pub fn python(interpreter: impl Into<OsString>, library_dir: impl Into<PathBuf>) -> Self {
        Self::with_driver(interpreter, ["-c", DRIVER_SOURCE], library_dir)
    }

    /// Run a custom driver command speaking the same stdin/stdout protocol
    #[must_use]
    pub fn with_driver<I, S>(program: impl Into<OsString>, args: I, library_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            library_dir: library_dir.into(),
            inherited: SearchPath::inherited(),
        }
    }

    /// Directory of the external library (worker working directory)
    #[inline]
    #[must_use]
    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Search path for a worker serving `context`: workspace root first,
    /// then the library, then whatever this process inherited
    #[must_use]
    pub fn search_path(&self, context: &LoadContext) -> SearchPath {
        let mut path = self.inherited.clone();
        path.push_front(&self.library_dir);
        path.push_front(&context.workspace_root);
        path
    }

    fn command(&self, job: &PipelineJob) -> Result<Command, PipelineFailure> {
        let search_path = self
            .search_path(&job.context)
            .to_os_string()
            .map_err(|e| PipelineFailure::new(FailureKind::Spawn, format!("invalid search path: {e}")))?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.library_dir)
            .env(SEARCH_PATH_VAR, search_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        if job.wants_native_backtrace() && std::env::var_os("RUST_BACKTRACE").is_none() {
            cmd.env("RUST_BACKTRACE", "1");
        }
        Ok(cmd)
    }
}

#[async_trait::async_trait]
impl PipelineBackend for SubprocessBackend {
    async fn execute(&self, job: &PipelineJob) -> Result<(), PipelineFailure> {
        let payload = serde_json::to_vec(job)
            .map_err(|e| PipelineFailure::new(FailureKind::Protocol, format!("cannot encode job: {e}")))?;

        let mut child = self.command(job)?.spawn().map_err(|e| {
            PipelineFailure::new(
                FailureKind::Spawn,
                format!("failed to start {}: {e}", self.program.to_string_lossy()),
            )
        })?;
        let _group = WorkerGroup { leader: child.id() };
        tracing::debug!(pid = ?child.id(), game = %job.context.game_id, "pipeline worker started");

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that dies before reading closes the pipe; its report or exit status says why.
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::debug!(error = %e, "pipeline worker closed stdin early");
            }
        }

        let output = child.wait_with_output().await.map_err(|e| {
            PipelineFailure::new(FailureKind::Spawn, format!("failed to collect worker output: {e}"))
        })?;
        read_report(&output)
    }
}

/// Kills the worker's whole process group when dropped
///
/// The worker leads its own group, so helpers it forks (pool processes,
/// the optimizer binary) are reaped together with it, whether the job
/// finished or was cut off by the time limit.
#[derive(Debug)]
#[cfg_attr(not(unix), allow(dead_code))]
struct WorkerGroup {
    leader: Option<u32>,
}

impl Drop for WorkerGroup {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.leader {
            let reaped = std::process::Command::new("sh")
                .args(["-c", &format!("kill -s KILL -- -{pgid} 2>/dev/null")])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            tracing::debug!(pgid, killed = reaped.is_ok_and(|s| s.success()), "reaped pipeline worker group");
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkerReport {
    ok: bool,
    #[serde(default)]
    kind: Option<FailureKind>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    traceback: Option<String>,
}

fn read_report(output: &Output) -> Result<(), PipelineFailure> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Err(PipelineFailure::new(
            FailureKind::Protocol,
            format!("worker exited ({}) without a report", output.status),
        )
        .with_traceback(tail(&stderr, STDERR_TAIL_BYTES)));
    };

    let report: WorkerReport = serde_json::from_str(line.trim()).map_err(|e| {
        PipelineFailure::new(FailureKind::Protocol, format!("unreadable worker report: {e}"))
            .with_traceback(tail(&stderr, STDERR_TAIL_BYTES))
    })?;

    if report.ok {
        return Ok(());
    }
    Err(PipelineFailure {
        kind: report.kind.unwrap_or(FailureKind::Stage),
        message: report.error.unwrap_or_default(),
        traceback: report.traceback,
    })
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

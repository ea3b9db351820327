use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use crate::models::policy::CapturePolicy;

/// Number of trailing diagnostic lines kept from the capture process.
pub const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// How long to keep draining stderr after the process has exited.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Successful capture: the artifact exists and is non-empty.
#[derive(Debug, Clone)]
pub struct CaptureReport {
    pub size_bytes: u64,
    pub elapsed: Duration,
    pub diagnostic_tail: String,
}

/// Materializes a stream URL into a file at `output`.
#[async_trait]
pub trait Capture: Send + Sync {
    async fn capture(
        &self,
        url: &str,
        output: &Path,
        policy: &CapturePolicy,
    ) -> Result<CaptureReport, CaptureError>;
}

/// Capture backed by an ffmpeg child process.
pub struct FfmpegCapture {
    program: PathBuf,
}

impl FfmpegCapture {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Capture for FfmpegCapture {
    async fn capture(
        &self,
        url: &str,
        output: &Path,
        policy: &CapturePolicy,
    ) -> Result<CaptureReport, CaptureError> {
        let started = Instant::now();
        let budget = policy.time_budget();

        let mut cmd = Command::new(&self.program);
        cmd.args(capture_args(url, output, policy))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(CaptureError::Spawn)?;
        let tail = tokio::spawn(collect_tail(child.stderr.take(), DIAGNOSTIC_TAIL_LINES));

        let status = match tokio::time::timeout(budget, child.wait()).await {
            Ok(status) => status.map_err(CaptureError::Io)?,
            Err(_) => {
                tracing::warn!(
                    budget_secs = budget.as_secs(),
                    "Capture exceeded time budget, killing process"
                );
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill capture process");
                }
                tail.abort();
                return Err(CaptureError::TimedOut { limit: budget });
            }
        };

        let diagnostic_tail = match tokio::time::timeout(STDERR_DRAIN_TIMEOUT, tail).await {
            Ok(Ok(lines)) => lines,
            _ => String::new(),
        };

        if !status.success() {
            return Err(CaptureError::Failed {
                exit_code: status.code(),
                diagnostic_tail,
            });
        }

        let size_bytes = match tokio::fs::metadata(output).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(CaptureError::Io(e)),
        };
        if size_bytes == 0 {
            return Err(CaptureError::NoOutput);
        }

        Ok(CaptureReport {
            size_bytes,
            elapsed: started.elapsed(),
            diagnostic_tail,
        })
    }
}

/// Build the ffmpeg argument list for one capture.
///
/// Runs quietly and non-interactively, reconnects on transient drops, caps the
/// captured duration, copies codecs as-is and repackages ADTS audio for MP4.
pub fn capture_args(url: &str, output: &Path, policy: &CapturePolicy) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect();

    if let Some(block) = header_block(policy) {
        args.push("-headers".into());
        args.push(block.into());
    }

    if policy.reconnect {
        args.extend(
            [
                "-reconnect",
                "1",
                "-reconnect_streamed",
                "1",
                "-reconnect_on_network_error",
                "1",
                "-reconnect_delay_max",
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(policy.reconnect_delay_max.as_secs().to_string().into());
    }

    args.push("-i".into());
    args.push(url.into());
    args.push("-t".into());
    args.push(policy.max_duration.as_secs().to_string().into());
    args.extend(
        ["-c", "copy", "-bsf:a", "aac_adtstoasc", "-movflags", "+faststart"]
            .into_iter()
            .map(OsString::from),
    );
    args.push(output.as_os_str().to_owned());
    args
}

/// Concatenated HTTP header lines, each terminated by CRLF.
///
/// Returns `None` when no header is configured so no `-headers` flag is passed.
pub fn header_block(policy: &CapturePolicy) -> Option<String> {
    let mut block = String::new();
    for (name, value) in [
        ("User-Agent", policy.user_agent.as_deref()),
        ("Referer", policy.referer.as_deref()),
    ] {
        if let Some(value) = value {
            // CR/LF in a value would start a new header line
            let value: String = value.chars().filter(|c| *c != '\r' && *c != '\n').collect();
            let _ = write!(block, "{name}: {value}\r\n");
        }
    }
    (!block.is_empty()).then_some(block)
}

async fn collect_tail(stderr: Option<ChildStderr>, limit: usize) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };

    let mut lines = BufReader::new(stderr).lines();
    let mut tail: VecDeque<String> = VecDeque::with_capacity(limit);
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if tail.len() == limit {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    Vec::from(tail).join("\n")
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture process failed (exit code {exit_code:?})")]
    Failed {
        exit_code: Option<i32>,
        diagnostic_tail: String,
    },

    #[error("capture exceeded its {}s time budget", limit.as_secs())]
    TimedOut { limit: Duration },

    #[error("capture produced no output")]
    NoOutput,

    #[error("failed to start capture process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture I/O error: {0}")]
    Io(#[source] std::io::Error),
}

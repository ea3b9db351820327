//! Test doubles for the capture process and the chat delivery sink

#![allow(dead_code)]

use async_trait::async_trait;
use hls_relay::models::job::Requester;
use hls_relay::models::policy::CapturePolicy;
use hls_relay::services::capture::{Capture, CaptureError, CaptureReport};
use hls_relay::services::delivery::{DeliveryError, DeliverySink};
use hls_relay::services::dispatcher::JobDispatcher;
use hls_relay::services::runner::JobRunner;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const MB: u64 = 1024 * 1024;

/// Policy with a 2 MB upload ceiling so size limits are cheap to exercise.
pub fn test_policy() -> CapturePolicy {
    CapturePolicy {
        max_upload_bytes: 2 * MB,
        ..CapturePolicy::default()
    }
}

// ── Delivery sink ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Text {
        chat_id: i64,
        message: String,
    },
    File {
        chat_id: i64,
        filename: String,
        caption: String,
        size_bytes: u64,
    },
}

/// Records every notification; can be told to fail texts or files.
#[derive(Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
    fail_texts: bool,
    fail_files: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_files() -> Arc<Self> {
        Arc::new(Self {
            fail_files: true,
            ..Self::default()
        })
    }

    pub fn failing_texts() -> Arc<Self> {
        Arc::new(Self {
            fail_texts: true,
            ..Self::default()
        })
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn texts(&self, chat_id: i64) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notice::Text { chat_id: c, message } if *c == chat_id => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn files(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .iter()
            .filter(|n| matches!(n, Notice::File { .. }))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn notify_text(&self, to: &Requester, message: &str) -> Result<(), DeliveryError> {
        self.notices.lock().push(Notice::Text {
            chat_id: to.chat_id,
            message: message.to_string(),
        });
        if self.fail_texts {
            return Err(DeliveryError::Api {
                description: "Too Many Requests".to_string(),
            });
        }
        Ok(())
    }

    async fn notify_file(
        &self,
        to: &Requester,
        path: &Path,
        filename: &str,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let size_bytes = tokio::fs::metadata(path).await?.len();
        self.notices.lock().push(Notice::File {
            chat_id: to.chat_id,
            filename: filename.to_string(),
            caption: caption.to_string(),
            size_bytes,
        });
        if self.fail_files {
            return Err(DeliveryError::Api {
                description: "Request Entity Too Large".to_string(),
            });
        }
        Ok(())
    }
}

// ── Capture ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Behavior {
    /// Write `n` bytes and exit cleanly.
    Write(u64),
    /// Leave a partial file and fail with this diagnostic output.
    Fail(&'static str),
    /// Leave a partial file and report a timeout.
    TimeOut,
    /// Exit cleanly but leave an empty file.
    Empty,
    /// Leave a file behind and panic.
    Panic,
    /// Sleep, then write `n` bytes.
    Slow(Duration, u64),
    /// Decide by URL: "fail" fails, "slow" sleeps 100 ms, anything else writes 1 KiB.
    ByUrl,
}

pub struct FakeCapture {
    behavior: Behavior,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    paths: Mutex<Vec<PathBuf>>,
}

impl FakeCapture {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            paths: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of captures observed running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Artifact paths handed to this capture, in call order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    fn resolve(&self, url: &str) -> Behavior {
        match &self.behavior {
            Behavior::ByUrl if url.contains("fail") => Behavior::Fail("HTTP error 404 Not Found"),
            Behavior::ByUrl if url.contains("slow") => {
                Behavior::Slow(Duration::from_millis(100), 1024)
            }
            Behavior::ByUrl => Behavior::Write(1024),
            other => other.clone(),
        }
    }

    async fn perform(
        &self,
        behavior: &Behavior,
        output: &Path,
        policy: &CapturePolicy,
    ) -> Result<CaptureReport, CaptureError> {
        let started = Instant::now();
        match behavior {
            Behavior::Write(n) => write_bytes(output, *n).await,
            Behavior::Fail(diag) => {
                write_bytes(output, 100).await?;
                return Err(CaptureError::Failed {
                    exit_code: Some(1),
                    diagnostic_tail: diag.to_string(),
                });
            }
            Behavior::TimeOut => {
                write_bytes(output, 100).await?;
                return Err(CaptureError::TimedOut {
                    limit: policy.time_budget(),
                });
            }
            Behavior::Empty => write_bytes(output, 0).await,
            Behavior::Panic => {
                write_bytes(output, 100).await?;
                panic!("capture backend exploded");
            }
            Behavior::Slow(delay, n) => {
                tokio::time::sleep(*delay).await;
                write_bytes(output, *n).await
            }
            Behavior::ByUrl => unreachable!("resolved before perform"),
        }?;

        Ok(CaptureReport {
            size_bytes: tokio::fs::metadata(output).await.map_err(CaptureError::Io)?.len(),
            elapsed: started.elapsed(),
            diagnostic_tail: String::new(),
        })
    }
}

async fn write_bytes(path: &Path, n: u64) -> Result<(), CaptureError> {
    tokio::fs::write(path, vec![0u8; n as usize])
        .await
        .map_err(CaptureError::Io)
}

#[async_trait]
impl Capture for FakeCapture {
    async fn capture(
        &self,
        url: &str,
        output: &Path,
        policy: &CapturePolicy,
    ) -> Result<CaptureReport, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().push(output.to_path_buf());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let behavior = self.resolve(url);
        let result = self.perform(&behavior, output, policy).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

// ── Wiring ───────────────────────────────────────────────────────────

pub fn runner(
    capture: Arc<FakeCapture>,
    sink: Arc<RecordingSink>,
    work_dir: &Path,
) -> JobRunner {
    JobRunner::new(capture, sink, test_policy(), work_dir)
}

pub fn dispatcher(
    capture: Arc<FakeCapture>,
    sink: Arc<RecordingSink>,
    work_dir: &Path,
    max_concurrent: usize,
) -> JobDispatcher {
    let runner = Arc::new(runner(capture, sink.clone(), work_dir));
    JobDispatcher::new(runner, sink, max_concurrent)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

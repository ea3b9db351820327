use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::models::job::{CaptureJob, JobStatus, Requester};
use crate::models::policy::CapturePolicy;
use crate::services::capture::{Capture, CaptureError};
use crate::services::delivery::{DeliveryError, DeliverySink};
use crate::services::messages;

/// Drives one capture job from `Accepted` to a terminal state.
pub struct JobRunner {
    capture: Arc<dyn Capture>,
    sink: Arc<dyn DeliverySink>,
    policy: CapturePolicy,
    work_dir: PathBuf,
}

impl JobRunner {
    pub fn new(
        capture: Arc<dyn Capture>,
        sink: Arc<dyn DeliverySink>,
        policy: CapturePolicy,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            capture,
            sink,
            policy,
            work_dir: work_dir.into(),
        }
    }

    pub fn policy(&self) -> &CapturePolicy {
        &self.policy
    }

    /// Create a job with a unique artifact path in the work directory.
    pub fn new_job(&self, url: &str, requester: Requester) -> CaptureJob {
        CaptureJob::new(url, requester, &self.work_dir)
    }

    /// Run the job to a terminal state. Never fails: every error is reported to
    /// the requester and reflected in the returned job's status. The artifact
    /// file is removed before this returns.
    pub async fn run(&self, mut job: CaptureJob) -> CaptureJob {
        let started = Instant::now();
        let artifact = Artifact::new(job.artifact_path.clone());
        job.status = JobStatus::Running;

        tracing::info!(job_id = %job.id, chat_id = job.requester.chat_id, url = %job.url, "Job running");

        let result = AssertUnwindSafe(self.drive(&mut job, &artifact))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(JobError::Internal(panic_message(panic.as_ref()))));

        job.status = match result {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(job_id = %job.id, error = %err, "Job did not succeed");
                self.notify(&job, &err.user_message(&self.policy)).await;
                err.status()
            }
        };

        artifact.release().await;

        let elapsed = started.elapsed();
        metrics::counter!("capture_jobs_finished", "status" => job.status.to_string()).increment(1);
        metrics::histogram!("capture_job_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            size_bytes = ?job.size_bytes,
            elapsed_ms = elapsed.as_millis() as u64,
            "Job finished"
        );

        job
    }

    async fn drive(&self, job: &mut CaptureJob, artifact: &Artifact) -> Result<JobStatus, JobError> {
        self.notify(job, &messages::started(self.policy.max_duration)).await;

        let report = self
            .capture
            .capture(&job.url, artifact.path(), &self.policy)
            .await?;

        // Measure what is on disk rather than trusting the report
        let size = match tokio::fs::metadata(artifact.path()).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(JobError::Internal(format!("cannot stat artifact: {e}"))),
        };
        job.size_bytes = Some(size);

        tracing::info!(
            job_id = %job.id,
            size_bytes = size,
            capture_ms = report.elapsed.as_millis() as u64,
            "Capture complete"
        );

        if size == 0 {
            return Err(CaptureError::NoOutput.into());
        }
        if size > self.policy.max_upload_bytes {
            return Err(JobError::TooLarge {
                size,
                limit: self.policy.max_upload_bytes,
            });
        }

        self.notify(job, &messages::uploading(size)).await;
        self.sink
            .notify_file(
                &job.requester,
                artifact.path(),
                &job.file_name(),
                &messages::caption(size),
            )
            .await?;

        metrics::counter!("capture_bytes_delivered").increment(size);
        Ok(JobStatus::Succeeded)
    }

    /// Best-effort progress or error notice. Failures are logged only.
    async fn notify(&self, job: &CaptureJob, message: &str) {
        if let Err(e) = self.sink.notify_text(&job.requester, message).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to send notification");
        }
    }
}

/// Job-scoped artifact path. Removed on `release`, or on drop if the job
/// future is abandoned before reaching a terminal state.
struct Artifact {
    path: PathBuf,
    released: bool,
}

impl Artifact {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn release(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove artifact")
            }
        }
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}

/// Why a job did not reach `Succeeded`.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("artifact is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Terminal state this error leaves the job in.
    pub fn status(&self) -> JobStatus {
        match self {
            JobError::Capture(CaptureError::TimedOut { .. }) => JobStatus::TimedOut,
            JobError::TooLarge { .. } => JobStatus::TooLarge,
            _ => JobStatus::Failed,
        }
    }

    pub fn user_message(&self, policy: &CapturePolicy) -> String {
        match self {
            JobError::Capture(CaptureError::Failed {
                diagnostic_tail, ..
            }) => messages::failed(diagnostic_tail),
            JobError::Capture(CaptureError::NoOutput) => messages::no_output(),
            JobError::Capture(CaptureError::TimedOut { limit }) => messages::timed_out(*limit),
            JobError::Capture(e @ (CaptureError::Spawn(_) | CaptureError::Io(_))) => {
                messages::internal(&e.to_string())
            }
            JobError::TooLarge { size, .. } => messages::too_large(*size, policy.max_upload_mb()),
            JobError::Delivery(e) => messages::delivery_failed(&e.to_string()),
            JobError::Internal(reason) => messages::internal(reason),
        }
    }
}

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::job::{CaptureJob, Requester};
use crate::services::delivery::DeliverySink;
use crate::services::messages;
use crate::services::runner::JobRunner;

/// File-extension token of an HLS playlist.
const PLAYLIST_MARKER: &str = ".m3u8";

/// Validate that `text` looks like an HLS playlist URL and return it trimmed.
pub fn validate_stream_url(text: &str) -> Result<&str, ValidationError> {
    let url = text.trim();
    if url.is_empty() {
        return Err(ValidationError::Empty);
    }

    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(ValidationError::MissingScheme);
    }
    if url.chars().any(char::is_whitespace) {
        return Err(ValidationError::NotSingleUrl);
    }
    if !lower.contains(PLAYLIST_MARKER) {
        return Err(ValidationError::NotPlaylist);
    }
    Ok(url)
}

/// Result of handing a message to the dispatcher.
#[derive(Debug)]
pub enum Submission {
    Rejected(ValidationError),
    Accepted {
        job_id: Uuid,
        handle: JoinHandle<CaptureJob>,
    },
}

/// Accepts requests and runs each accepted job on its own task.
pub struct JobDispatcher {
    runner: Arc<JobRunner>,
    sink: Arc<dyn DeliverySink>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl JobDispatcher {
    pub fn new(runner: Arc<JobRunner>, sink: Arc<dyn DeliverySink>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            runner,
            sink,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Validate `text` and start a job for it. Returns without waiting for the
    /// job; the acknowledgment and all later notices are sent from the job's task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str, requester: Requester) -> Submission {
        let url = match validate_stream_url(text) {
            Ok(url) => url,
            Err(e) => {
                tracing::info!(chat_id = requester.chat_id, reason = %e, "Rejected request");
                metrics::counter!("capture_jobs_rejected").increment(1);
                let sink = Arc::clone(&self.sink);
                tokio::spawn(async move {
                    if let Err(e) = sink.notify_text(&requester, messages::INVALID_LINK).await {
                        tracing::warn!(chat_id = requester.chat_id, error = %e, "Failed to send rejection");
                    }
                });
                return Submission::Rejected(e);
            }
        };

        let job = self.runner.new_job(url, requester);
        let job_id = job.id;
        tracing::info!(job_id = %job_id, chat_id = requester.chat_id, "Job accepted");
        metrics::counter!("capture_jobs_total").increment(1);

        let runner = Arc::clone(&self.runner);
        let sink = Arc::clone(&self.sink);
        let permits = Arc::clone(&self.permits);
        let handle = tokio::spawn(async move {
            if let Err(e) = sink.notify_text(&job.requester, messages::ACCEPTED).await {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to send acknowledgment");
            }

            // Held until the job reaches a terminal state
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::error!(job_id = %job.id, "Job semaphore closed, running unbounded");
                    None
                }
            };

            runner.run(job).await
        });

        Submission::Accepted { job_id, handle }
    }

    /// Jobs currently holding a run slot.
    pub fn active_jobs(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("message is empty")]
    Empty,

    #[error("link must start with http:// or https://")]
    MissingScheme,

    #[error("message must contain a single link")]
    NotSingleUrl,

    #[error("link is not a .m3u8 playlist")]
    NotPlaylist,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle state of a capture job.
///
/// `Accepted -> Running -> {Succeeded | Failed | TimedOut | TooLarge}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Accepted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    TooLarge,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut | JobStatus::TooLarge
        )
    }
}

/// Where notifications for a job are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub chat_id: i64,
    /// Message to reply to, when the request came from a specific message.
    pub reply_to: Option<i64>,
}

impl Requester {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            reply_to: None,
        }
    }
}

/// One attempt to capture a single stream URL into a deliverable file.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub id: Uuid,
    pub url: String,
    pub requester: Requester,
    pub artifact_path: PathBuf,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub size_bytes: Option<u64>,
}

impl CaptureJob {
    /// Create a job whose artifact lives at a unique path inside `work_dir`.
    pub fn new(url: impl Into<String>, requester: Requester, work_dir: &std::path::Path) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            url: url.into(),
            requester,
            artifact_path: work_dir.join(format!("hls-relay-{id}.mp4")),
            status: JobStatus::Accepted,
            started_at: Utc::now(),
            size_bytes: None,
        }
    }

    /// File name shown to the requester.
    pub fn file_name(&self) -> String {
        format!("stream-{}.mp4", &self.id.simple().to_string()[..8])
    }
}

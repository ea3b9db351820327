use std::time::Duration;

/// Extra wall-clock time a capture may run past `max_duration` before it is killed.
pub const CAPTURE_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Per-process capture configuration. Built once at startup and cloned into jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePolicy {
    pub max_duration: Duration,
    pub max_upload_bytes: u64,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub reconnect: bool,
    pub reconnect_delay_max: Duration,
    pub grace_period: Duration,
}

impl CapturePolicy {
    /// Hard wall-clock budget for one capture process.
    pub fn time_budget(&self) -> Duration {
        self.max_duration + self.grace_period
    }

    /// Upload ceiling in whole MB, for user-facing messages.
    pub fn max_upload_mb(&self) -> u64 {
        self.max_upload_bytes / (1024 * 1024)
    }
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(900),
            max_upload_bytes: 200 * 1024 * 1024,
            user_agent: None,
            referer: None,
            reconnect: true,
            reconnect_delay_max: Duration::from_secs(5),
            grace_period: CAPTURE_GRACE_PERIOD,
        }
    }
}

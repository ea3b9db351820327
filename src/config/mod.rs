use garde::Validate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::policy::{CapturePolicy, CAPTURE_GRACE_PERIOD};

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Telegram bot token. Also used as the secret webhook path.
    #[garde(length(min = 1))]
    pub bot_token: String,

    /// Server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    #[garde(skip)]
    pub bind_addr: String,

    /// Maximum captured duration in seconds.
    #[serde(default = "default_max_duration")]
    #[garde(range(min = 1))]
    pub max_duration: u64,

    /// Maximum size of a delivered file in MB.
    #[serde(default = "default_max_upload_size")]
    #[garde(range(min = 1))]
    pub max_upload_size: u64,

    /// Optional User-Agent sent to the stream origin
    #[serde(default)]
    #[garde(skip)]
    pub user_agent: Option<String>,

    /// Optional Referer sent to the stream origin
    #[serde(default)]
    #[garde(skip)]
    pub referer: Option<String>,

    /// Path or name of the ffmpeg executable
    #[serde(default = "default_ffmpeg_bin")]
    #[garde(skip)]
    pub ffmpeg_bin: PathBuf,

    /// Directory for transient capture artifacts
    #[serde(default = "default_work_dir")]
    #[garde(skip)]
    pub work_dir: PathBuf,

    /// Number of captures allowed to run at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    #[garde(range(min = 1))]
    pub max_concurrent_jobs: usize,

    /// Bot API base URL. Point at a local Bot API server to lift upload limits.
    #[serde(default = "default_telegram_api_url")]
    #[garde(skip)]
    pub telegram_api_url: String,

    /// Public base URL of this service. When set, the webhook is registered on startup.
    #[serde(default)]
    #[garde(skip)]
    pub webhook_url: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_duration() -> u64 {
    900
}

fn default_max_upload_size() -> u64 {
    200
}

fn default_ffmpeg_bin() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from explicit key/value pairs (env-style names).
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(pairs)?;
        config.validate()?;
        Ok(config)
    }

    /// Immutable capture policy shared by value into every job.
    pub fn capture_policy(&self) -> CapturePolicy {
        CapturePolicy {
            max_duration: Duration::from_secs(self.max_duration),
            max_upload_bytes: self.max_upload_size * 1024 * 1024,
            user_agent: non_empty(self.user_agent.as_deref()),
            referer: non_empty(self.referer.as_deref()),
            reconnect: true,
            reconnect_delay_max: Duration::from_secs(5),
            grace_period: CAPTURE_GRACE_PERIOD,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}

//! User-facing notification texts.

use std::time::Duration;

use crate::services::capture::DIAGNOSTIC_TAIL_LINES;

pub const USAGE: &str = "Send me an HTTP(S) link to a .m3u8 stream (non-DRM) and I will send the video back.";

pub const INVALID_LINK: &str = "Send a valid .m3u8 link (non-DRM).";

pub const ACCEPTED: &str = "Downloading… please wait";

/// Format a byte count in MB with one decimal place.
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

pub fn started(max_duration: Duration) -> String {
    format!(
        "⏳ Capture started (up to {} min of the stream).",
        max_duration.as_secs().div_ceil(60)
    )
}

pub fn failed(diagnostic_tail: &str) -> String {
    let tail = last_lines(diagnostic_tail, DIAGNOSTIC_TAIL_LINES);
    let mut text = "❌ Failed. The stream may be DRM-protected or the link invalid.".to_string();
    if !tail.is_empty() {
        text.push_str("\n\n");
        text.push_str(&tail);
    }
    text
}

pub fn no_output() -> String {
    "❌ Failed: the capture produced an empty file. The stream may be DRM-protected or the link invalid."
        .to_string()
}

pub fn timed_out(limit: Duration) -> String {
    format!(
        "⏱ Timed out after {} s. Try a shorter or lighter stream.",
        limit.as_secs()
    )
}

pub fn uploading(size_bytes: u64) -> String {
    format!("✅ Finished ({}), uploading…", format_size(size_bytes))
}

pub fn caption(size_bytes: u64) -> String {
    format!("✅ Done ({})", format_size(size_bytes))
}

pub fn too_large(size_bytes: u64, limit_mb: u64) -> String {
    format!(
        "⚠️ The file is {}, above the {} MB upload limit.",
        format_size(size_bytes),
        limit_mb
    )
}

pub fn delivery_failed(reason: &str) -> String {
    format!("❌ Upload failed: {reason}")
}

pub fn internal(reason: &str) -> String {
    format!("❌ Unexpected error: {reason}")
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

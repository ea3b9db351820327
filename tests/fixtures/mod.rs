//! Sample inputs shared by the integration tests

#![allow(dead_code)]

pub const CHAT_ID: i64 = 4242;

/// Messages that must be rejected without creating a job.
pub const INVALID_MESSAGES: &[&str] = &[
    "",
    "hello there",
    "https://cdn.example.com/video.mp4",
    "ftp://cdn.example.com/live/index.m3u8",
    "cdn.example.com/live/index.m3u8",
    "www.example.com/m3u8",
    "https://a.example/x.m3u8 https://b.example/y.m3u8",
];

/// Messages that must be accepted.
pub const VALID_MESSAGES: &[&str] = &[
    "https://cdn.example.com/live/index.m3u8",
    "http://cdn.example.com/hls/MASTER.M3U8?token=abc",
    "  https://cdn.example.com/vod/playlist.m3u8\n",
];

/// Script bodies standing in for ffmpeg. `$out` is the last argument.
pub mod scripts {
    pub const FIND_OUTPUT: &str = "for arg; do out=\"$arg\"; done\n";

    pub fn writes_video() -> String {
        format!("{FIND_OUTPUT}printf 'fake-mp4-bytes' > \"$out\"\n")
    }

    pub fn fails_with_403() -> String {
        format!(
            "{FIND_OUTPUT}printf 'partial' > \"$out\"\n\
             echo '[hls] Opening playlist' >&2\n\
             echo 'Server returned 403 Forbidden (access denied)' >&2\n\
             exit 1\n"
        )
    }

    pub fn noisy_failure(lines: usize) -> String {
        format!(
            "i=1\nwhile [ $i -le {lines} ]; do echo \"diag line $i\" >&2; i=$((i+1)); done\nexit 8\n"
        )
    }

    pub const EXITS_CLEAN_WITHOUT_OUTPUT: &str = "exit 0\n";

    pub const HANGS: &str = "exec sleep 30\n";

    pub fn records_args(args_file: &std::path::Path) -> String {
        format!(
            "{FIND_OUTPUT}printf '%s\\n' \"$@\" > '{}'\nprintf 'x' > \"$out\"\n",
            args_file.display()
        )
    }
}

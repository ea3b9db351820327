//! HLS relay bot
//!
//! Receives chat messages over a webhook, captures the linked HLS stream with
//! ffmpeg into a transient file, and sends the file (or an error) back to the
//! chat. Each capture runs as an independent, time-bounded job whose artifact
//! is always removed when the job ends.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;

use hls_relay::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{
        capture::FfmpegCapture, delivery::TelegramClient, dispatcher::JobDispatcher,
        runner::JobRunner,
    },
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing hls-relay server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("capture_jobs_total", "Capture jobs accepted");
    metrics::describe_counter!(
        "capture_jobs_rejected",
        "Messages rejected before a job was created"
    );
    metrics::describe_counter!(
        "capture_jobs_finished",
        "Capture jobs that reached a terminal state, by status"
    );
    metrics::describe_histogram!(
        "capture_job_seconds",
        "Wall time of a capture job from start to terminal state"
    );
    metrics::describe_counter!(
        "capture_bytes_delivered",
        "Bytes of captured video delivered to chats"
    );

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .expect("Failed to create work directory");

    // Initialize Telegram client
    let telegram = Arc::new(
        TelegramClient::new(&config.telegram_api_url, &config.bot_token)
            .expect("Failed to initialize Telegram client"),
    );

    if let Some(base) = config.webhook_url.as_deref() {
        let url = format!("{}/{}", base.trim_end_matches('/'), config.bot_token);
        match telegram.set_webhook(&url).await {
            Ok(()) => tracing::info!("Webhook registered"),
            Err(e) => tracing::error!(error = %e, "Failed to register webhook"),
        }
    }

    let policy = config.capture_policy();
    tracing::info!(
        max_duration_secs = policy.max_duration.as_secs(),
        max_upload_mb = policy.max_upload_mb(),
        headers = policy.user_agent.is_some() || policy.referer.is_some(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        work_dir = %config.work_dir.display(),
        "Capture policy loaded"
    );

    let runner = JobRunner::new(
        Arc::new(FfmpegCapture::new(&config.ffmpeg_bin)),
        telegram.clone(),
        policy,
        &config.work_dir,
    );
    let dispatcher = JobDispatcher::new(
        Arc::new(runner),
        telegram.clone(),
        config.max_concurrent_jobs,
    );

    let state = AppState::new(&config.bot_token, dispatcher, telegram);
    let app = routes::router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

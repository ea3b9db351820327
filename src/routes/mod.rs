use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod metrics;
pub mod webhook;

/// Largest accepted webhook body. Updates are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the HTTP surface: liveness, health, metrics and the bot webhook.
pub fn router(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    Router::new()
        .route("/", get(health::liveness))
        .route("/health", get(health::health_check))
        .route("/{token}", post(webhook::telegram_webhook))
        .with_state(state)
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        )
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

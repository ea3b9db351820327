use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub jobs: JobCapacity,
}

#[derive(Serialize)]
pub struct JobCapacity {
    pub active: usize,
    pub max_concurrent: usize,
}

/// GET / — plain liveness probe.
pub async fn liveness() -> &'static str {
    "OK"
}

/// GET /health — service status with job capacity.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        jobs: JobCapacity {
            active: state.dispatcher.active_jobs(),
            max_concurrent: state.dispatcher.max_concurrent(),
        },
    })
}

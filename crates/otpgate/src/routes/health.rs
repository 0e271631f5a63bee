//! Health check endpoints.

use axum::{Json, extract::State};
use otpgate_common::ChallengeStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct MetricsResponse {
    uptime_secs: u64,
    challenges: ChallengeStats,
}

/// Metrics endpoint (for monitoring)
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        challenges: state.otp.stats(),
    })
}

//! HTTP route handlers for Otpgate.

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::state::AppState;

mod health;
mod otp;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let timeout = timeout_layer(Duration::from_secs(state.config.request_timeout_secs));

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))

        // Challenge endpoints
        .nest("/otp", otp_routes())

        .layer(timeout)
        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}

/// Requests running past `timeout` are answered with 408
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn otp_routes() -> Router<AppState> {
    Router::new()
        .route("/issue", post(otp::issue_challenge))
        .route("/resend", post(otp::resend_challenge))
        .route("/verify", post(otp::verify_challenge))
}

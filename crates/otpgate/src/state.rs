//! Application state and shared resources.

use std::sync::Arc;
use std::time::Instant;

use otpgate::OtpService;

use crate::config::AppConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Challenge service
    pub otp: Arc<OtpService>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, otp: Arc<OtpService>) -> Self {
        Self {
            config: Arc::new(config),
            otp,
            started_at: Instant::now(),
        }
    }
}

//! # Otpgate
//!
//! One-time passcode gate for phone-number login. Issues numeric codes,
//! verifies them within a fixed TTL and attempt budget, and sweeps
//! abandoned challenges in the background.
//!
//! ## Architecture
//! ```text
//! Controller → Otpgate → Identity gateway
//!                 ↓
//!          Challenge store (in memory) ← Reaper
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod routes;
mod state;

use config::AppConfig;
use otpgate::OtpService;
use otpgate::sender::LogSender;
use state::AppState;

/// Otpgate - one-time passcode challenge service
#[derive(Parser, Debug)]
#[command(name = "otpgate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/otpgate.toml", env = "OTPGATE_CONFIG")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    /// Write issued codes to the debug log (development only)
    #[arg(long, default_value = "false")]
    log_codes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment from .env, if present
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🔐 Starting Otpgate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Start the challenge service (spawns the reaper)
    let sender = Arc::new(LogSender::new(config.delivery.log_codes));
    let otp = Arc::new(
        OtpService::start(config.service_config(), sender)
            .context("Failed to start OTP service")?,
    );

    // Build router
    let state = AppState::new(config.clone(), otp.clone());
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Otpgate listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("🛑 Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    // The router's state clones are gone once serve returns
    match Arc::try_unwrap(otp) {
        Ok(otp) => {
            if let Err(e) = otp.shutdown().await {
                tracing::error!(error = %e, "OTP service shutdown failed");
            }
        }
        Err(_) => tracing::warn!("OTP service still referenced; reaper aborted on drop"),
    }

    info!("👋 Otpgate shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init()
            .context("Failed to initialize logging")?;
    }

    Ok(())
}

//! Configuration management for Otpgate.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use otpgate::ServiceConfig;
use otpgate::challenge::StoreConfig;
use otpgate_common::constants::{
    CHALLENGE_TTL_SECS, CODE_DIGITS, DEFAULT_LISTEN_ADDR, MAX_VERIFY_ATTEMPTS,
    REAPER_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Challenge configuration
    #[serde(default)]
    pub challenge: ChallengeConfig,

    /// Delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Challenge lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeConfig {
    /// Challenge validity in seconds
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// Wrong codes allowed before lockout
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Digits per code
    #[serde(default = "default_code_digits")]
    pub code_digits: u32,

    /// Interval between expired-challenge sweeps
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            max_attempts: default_max_attempts(),
            code_digits: default_code_digits(),
            reaper_interval_secs: default_reaper_interval(),
        }
    }
}

/// Code delivery configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryConfig {
    /// Write issued codes to the debug log (development only)
    #[serde(default)]
    pub log_codes: bool,
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_request_timeout() -> u64 { 10 }
fn default_ttl() -> u64 { CHALLENGE_TTL_SECS } // 5 minutes
fn default_max_attempts() -> u32 { MAX_VERIFY_ATTEMPTS }
fn default_code_digits() -> u32 { CODE_DIGITS }
fn default_reaper_interval() -> u64 { REAPER_INTERVAL_SECS } // 5 minutes

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = Self::from_file(config_path)?;

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if args.log_codes {
            config.delivery.log_codes = true;
        }

        Ok(config)
    }

    fn from_file(config_path: &str) -> Result<Self> {
        if !Path::new(config_path).exists() {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()
            .context("Failed to load config file")?;

        settings
            .try_deserialize()
            .context("Failed to parse config")
    }

    /// Service parameters derived from the challenge section
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            store: StoreConfig {
                ttl_secs: self.challenge.ttl_secs,
                max_attempts: self.challenge.max_attempts,
            },
            code_digits: self.challenge.code_digits,
            reaper_interval: Duration::from_secs(self.challenge.reaper_interval_secs),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_secs: default_request_timeout(),
            challenge: ChallengeConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.challenge.ttl_secs, 300);
        assert_eq!(config.challenge.max_attempts, 3);
        assert!(!config.delivery.log_codes);

        let service = config.service_config();
        assert_eq!(service.store.ttl_secs, 300);
        assert_eq!(service.reaper_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[challenge]\nmax_attempts = 5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.challenge.max_attempts, 5);
        assert_eq!(config.challenge.ttl_secs, 300);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = tokio_test::assert_ok!(AppConfig::from_file("does/not/exist.toml"));
        assert_eq!(config.challenge.code_digits, 6);
    }
}

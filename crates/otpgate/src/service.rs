//! Challenge service: the caller-facing surface over the store.
//!
//! Validates identifiers, issues codes through the store, hands them to the
//! delivery transport, and translates verification outcomes into
//! [`VerifyResponse`] values. Owns the reaper for its whole lifetime.

use otpgate_common::{ChallengeStats, IssueResponse, OtpError, VerifyResponse};
use std::sync::Arc;
use std::time::Duration;

use crate::challenge::{ChallengeStore, CodeGenerator, IssuedChallenge, StoreConfig};
use crate::clock::{Clock, SystemClock};
use crate::identifier::{fingerprint, validate_identifier};
use crate::reaper::{self, ReaperHandle};
use crate::sender::CodeSender;

/// Service construction parameters
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub code_digits: u32,
    pub reaper_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            code_digits: otpgate_common::constants::CODE_DIGITS,
            reaper_interval: Duration::from_secs(otpgate_common::constants::REAPER_INTERVAL_SECS),
        }
    }
}

/// One-time passcode service
pub struct OtpService {
    store: Arc<ChallengeStore>,
    sender: Arc<dyn CodeSender>,
    reaper: ReaperHandle,
}

impl OtpService {
    /// Build the store and start the reaper on the current runtime
    pub fn start(config: ServiceConfig, sender: Arc<dyn CodeSender>) -> Result<Self, OtpError> {
        Self::start_with_clock(config, sender, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        config: ServiceConfig,
        sender: Arc<dyn CodeSender>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, OtpError> {
        if config.reaper_interval.is_zero() {
            return Err(OtpError::Config("reaper interval must be non-zero".into()));
        }

        let generator = CodeGenerator::new(config.code_digits)?;
        let code_digits = generator.digits();
        let store = Arc::new(ChallengeStore::new(config.store, generator, clock)?);
        let reaper = reaper::spawn(store.clone(), config.reaper_interval);

        tracing::info!(
            ttl_secs = config.store.ttl_secs,
            max_attempts = config.store.max_attempts,
            code_digits = code_digits,
            "OTP service started"
        );

        Ok(Self {
            store,
            sender,
            reaper,
        })
    }

    /// Issue a challenge and deliver its code
    pub async fn issue_challenge(&self, identifier: &str) -> Result<IssueResponse, OtpError> {
        let identifier = validate_identifier(identifier)?;
        let issued = self.store.issue(&identifier).await?;
        self.deliver(&identifier, issued).await
    }

    /// Replace the current challenge and deliver the new code
    pub async fn resend_challenge(&self, identifier: &str) -> Result<IssueResponse, OtpError> {
        let identifier = validate_identifier(identifier)?;
        let issued = self.store.resend(&identifier).await?;
        self.deliver(&identifier, issued).await
    }

    /// Verify a submitted code.
    ///
    /// Every verification result, including rejection, is `Ok`; only a
    /// malformed identifier is an error.
    pub async fn verify_challenge(
        &self,
        identifier: &str,
        code: &str,
    ) -> Result<VerifyResponse, OtpError> {
        let identifier = validate_identifier(identifier)?;
        Ok(self.store.verify(&identifier, code).await.into())
    }

    pub fn stats(&self) -> ChallengeStats {
        self.store.stats()
    }

    /// Stop the reaper. Challenges are dropped with the service.
    pub async fn shutdown(self) -> Result<(), OtpError> {
        self.reaper.shutdown().await?;
        tracing::info!("OTP service stopped");
        Ok(())
    }

    async fn deliver(
        &self,
        identifier: &str,
        issued: IssuedChallenge,
    ) -> Result<IssueResponse, OtpError> {
        if let Err(e) = self.sender.send(identifier, &issued.code).await {
            tracing::error!(
                identifier = %fingerprint(identifier),
                error = %e,
                "Failed to deliver code"
            );
            return Err(match e {
                OtpError::Delivery(_) => e,
                other => OtpError::Delivery(other.to_string()),
            });
        }

        Ok(IssueResponse {
            expires_in_seconds: issued.expires_in_seconds,
        })
    }
}

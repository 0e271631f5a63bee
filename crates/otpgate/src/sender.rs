//! Code delivery.
//!
//! Delivery transports (SMS, voice) live outside this crate and plug in
//! through [`CodeSender`].

use async_trait::async_trait;
use otpgate_common::OtpError;

use crate::identifier::fingerprint;

/// Hands an issued code to the identifier's owner
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send(&self, identifier: &str, code: &str) -> Result<(), OtpError>;
}

/// Development sender that only logs.
///
/// The code itself is logged only when `log_codes` is set.
#[derive(Debug, Default, Clone)]
pub struct LogSender {
    pub log_codes: bool,
}

impl LogSender {
    pub fn new(log_codes: bool) -> Self {
        if log_codes {
            tracing::warn!("LogSender will write one-time codes to the log");
        }
        Self { log_codes }
    }
}

#[async_trait]
impl CodeSender for LogSender {
    async fn send(&self, identifier: &str, code: &str) -> Result<(), OtpError> {
        if self.log_codes {
            tracing::debug!(identifier = %fingerprint(identifier), code = %code, "Delivering code");
        } else {
            tracing::debug!(identifier = %fingerprint(identifier), "Delivering code");
        }
        Ok(())
    }
}

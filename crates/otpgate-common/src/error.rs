//! Common error types for Otpgate components.

use thiserror::Error;

/// Errors surfaced by the challenge service.
///
/// Verification outcomes (not found, expired, locked, mismatch) are not
/// errors; they are returned as [`crate::VerifyResponse`] values.
#[derive(Debug, Error)]
pub enum OtpError {
    /// Identifier failed format validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// The OS entropy source could not produce a code
    #[error("Code generation failed: {0}")]
    Generation(String),

    /// The code could not be handed to the delivery transport
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OtpError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidIdentifier(_) => 400,
            Self::Generation(_) => 500,
            Self::Delivery(_) => 502,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::Delivery(_) => "DELIVERY_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error should be retried
    ///
    /// Entropy failures are environmental and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(OtpError::InvalidIdentifier("x".into()).status_code(), 400);
        assert_eq!(OtpError::Generation("x".into()).status_code(), 500);
        assert_eq!(OtpError::Delivery("x".into()).status_code(), 502);
        assert_eq!(OtpError::Internal("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_generation_is_not_retryable() {
        assert!(!OtpError::Generation("entropy".into()).is_retryable());
        assert!(OtpError::Delivery("sms gateway down".into()).is_retryable());
    }
}

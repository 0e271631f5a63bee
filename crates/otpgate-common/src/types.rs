//! Core types shared across Otpgate components.

use serde::{Deserialize, Serialize};

/// Why a verification did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// No live challenge for the identifier; a new one must be issued
    NotFound,
    /// The challenge outlived its TTL
    Expired,
    /// Too many wrong codes were submitted
    Locked,
    /// Wrong code, attempts remain
    Mismatch,
}

/// Result of issuing or resending a challenge.
///
/// The code itself is never part of this response; it only travels
/// through the delivery transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub expires_in_seconds: u64,
}

/// Result of a verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,

    /// Verified identifier, present only on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Failure reason, present only when `verified` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,

    /// Attempts left, present only for [`FailureReason::Mismatch`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
}

impl VerifyResponse {
    pub fn verified(identifier: impl Into<String>) -> Self {
        Self {
            verified: true,
            identifier: Some(identifier.into()),
            reason: None,
            attempts_remaining: None,
        }
    }

    pub fn rejected(reason: FailureReason) -> Self {
        Self {
            verified: false,
            identifier: None,
            reason: Some(reason),
            attempts_remaining: None,
        }
    }

    pub fn mismatch(attempts_remaining: u32) -> Self {
        Self {
            attempts_remaining: Some(attempts_remaining),
            ..Self::rejected(FailureReason::Mismatch)
        }
    }
}

/// Counters kept by the challenge store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeStats {
    /// Identifiers currently holding a slot. Advisory: a slot created by an
    /// in-flight issue is counted before its challenge is installed.
    pub live: usize,
    /// Challenges created by issue or resend
    pub issued: u64,
    /// Successful verifications
    pub verified: u64,
    /// Wrong codes that left attempts remaining
    pub mismatched: u64,
    /// Verifications rejected for expiry
    pub expired: u64,
    /// Challenges destroyed by lockout
    pub locked: u64,
    /// Challenges removed by the reaper
    pub evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verified_shape() {
        let json = serde_json::to_value(VerifyResponse::verified("9876543210")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "verified": true, "identifier": "9876543210" })
        );
    }

    #[test]
    fn test_mismatch_shape() {
        let json = serde_json::to_value(VerifyResponse::mismatch(2)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "verified": false, "reason": "MISMATCH", "attemptsRemaining": 2 })
        );
    }

    #[test]
    fn test_attempts_only_on_mismatch() {
        let json = serde_json::to_value(VerifyResponse::rejected(FailureReason::NotFound)).unwrap();
        assert_eq!(json, serde_json::json!({ "verified": false, "reason": "NOT_FOUND" }));
        let json = serde_json::to_value(VerifyResponse::rejected(FailureReason::Locked)).unwrap();
        assert_eq!(json, serde_json::json!({ "verified": false, "reason": "LOCKED" }));
    }

    #[test]
    fn test_issue_response_camel_case() {
        let json = serde_json::to_string(&IssueResponse { expires_in_seconds: 300 }).unwrap();
        assert_eq!(json, r#"{"expiresInSeconds":300}"#);
    }
}

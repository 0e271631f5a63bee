//! One-time passcode challenges.
//!
//! A challenge binds a numeric code to an identifier (a phone number) until
//! it is consumed, expires, or is locked out by too many wrong codes. At
//! most one challenge is live per identifier.

mod generator;
mod store;

pub use generator::CodeGenerator;
pub use store::{ChallengeStore, IssuedChallenge, StoreConfig, VerifyOutcome};

use chrono::{DateTime, Utc};

/// Stored challenge state, owned exclusively by the store
#[derive(Debug, Clone)]
pub struct ChallengeRecord {
    /// Identifier the code was issued to
    pub identifier: String,
    /// The expected code
    pub code: String,
    /// Issue timestamp
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Wrong codes submitted so far
    pub attempts: u32,
}

impl ChallengeRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

//! Shared constants for Otpgate components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Challenge validity window in seconds (5 minutes)
pub const CHALLENGE_TTL_SECS: u64 = 300;

/// Wrong-code submissions allowed before a challenge is locked out
pub const MAX_VERIFY_ATTEMPTS: u32 = 3;

/// Number of digits in an issued code
pub const CODE_DIGITS: u32 = 6;

/// Smallest and largest supported code widths
pub const MIN_CODE_DIGITS: u32 = 4;
pub const MAX_CODE_DIGITS: u32 = 9;

/// Interval between expired-challenge sweeps (5 minutes)
pub const REAPER_INTERVAL_SECS: u64 = 300;

/// Identifier shape accepted by the validation layer
pub mod identifier {
    /// Fewest digits in a phone identifier
    pub const MIN_DIGITS: usize = 10;

    /// Most digits in a phone identifier (E.164 upper bound)
    pub const MAX_DIGITS: usize = 15;
}

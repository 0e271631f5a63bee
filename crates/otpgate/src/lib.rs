//! # Otpgate
//!
//! One-time passcode challenges for phone-number login: issue a code,
//! verify it within its TTL and attempt budget, and sweep abandoned
//! challenges in the background.
//!
//! ## Modules
//! - `challenge` - Code generation and the keyed challenge store
//! - `reaper` - Background eviction of expired challenges
//! - `service` - Validation and outcome mapping over the store
//! - `sender` - Pluggable code delivery
//! - `identifier` - Identifier validation and log fingerprints
//! - `clock` - Time sources

pub mod challenge;
pub mod clock;
pub mod identifier;
pub mod reaper;
pub mod sender;
pub mod service;

pub use service::{OtpService, ServiceConfig};

//! # Otpgate Common
//!
//! Shared types and constants used across Otpgate components.
//!
//! ## Modules
//! - `types` - Caller-facing results (IssueResponse, VerifyResponse, etc.)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::OtpError;
pub use types::*;

//! Numeric code generation.
//!
//! Codes are drawn straight from the operating system's entropy source.
//! If the OS cannot supply randomness the draw fails; there is no fallback
//! to a userspace generator.

use otpgate_common::OtpError;
use otpgate_common::constants::{CODE_DIGITS, MAX_CODE_DIGITS, MIN_CODE_DIGITS};
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Fixed-width numeric code generator
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    digits: u32,
    /// Exclusive upper bound of the draw (10^digits)
    modulus: u32,
}

impl CodeGenerator {
    /// Create a generator for `digits`-wide codes
    pub fn new(digits: u32) -> Result<Self, OtpError> {
        if !(MIN_CODE_DIGITS..=MAX_CODE_DIGITS).contains(&digits) {
            return Err(OtpError::Config(format!(
                "code width must be between {} and {} digits, got {}",
                MIN_CODE_DIGITS, MAX_CODE_DIGITS, digits
            )));
        }

        Ok(Self {
            digits,
            modulus: 10u32.pow(digits),
        })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Generate a new zero-padded code
    pub fn generate(&self) -> Result<String, OtpError> {
        let value = self.draw()?;
        Ok(format!("{:0width$}", value, width = self.digits as usize))
    }

    /// Uniform draw in `0..modulus` by rejection sampling
    fn draw(&self) -> Result<u32, OtpError> {
        // Largest multiple of modulus that fits in u32
        let zone = u32::MAX - (u32::MAX % self.modulus);

        loop {
            let raw = OsRng.try_next_u32().map_err(|e| {
                tracing::error!(error = %e, "OS entropy source failed");
                OtpError::Generation(e.to_string())
            })?;

            if raw < zone {
                return Ok(raw % self.modulus);
            }
        }
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            digits: CODE_DIGITS,
            modulus: 10u32.pow(CODE_DIGITS),
        }
    }
}

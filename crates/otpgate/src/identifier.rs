//! Identifier validation and log redaction.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use otpgate_common::OtpError;
use otpgate_common::constants::identifier::{MAX_DIGITS, MIN_DIGITS};
use sha2::{Digest, Sha256};

/// Validate and normalize a phone identifier.
///
/// Accepts an optional leading `+` followed by 10 to 15 ASCII digits,
/// after trimming surrounding whitespace.
pub fn validate_identifier(raw: &str) -> Result<String, OtpError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OtpError::InvalidIdentifier(
            "identifier must contain only digits with an optional leading '+'".to_string(),
        ));
    }

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits.len()) {
        return Err(OtpError::InvalidIdentifier(format!(
            "identifier must have between {} and {} digits, got {}",
            MIN_DIGITS,
            MAX_DIGITS,
            digits.len()
        )));
    }

    Ok(trimmed.to_string())
}

/// Short stable token standing in for an identifier in logs
pub fn fingerprint(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_phone_numbers() {
        let plain = tokio_test::assert_ok!(validate_identifier("9876543210"));
        assert_eq!(plain, "9876543210");
        let international = tokio_test::assert_ok!(validate_identifier(" +919876543210 "));
        assert_eq!(international, "+919876543210");
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "+", "12345", "98765-43210", "abcdefghij", "1234567890123456", "++9876543210"] {
            let err = validate_identifier(bad).unwrap_err();
            assert!(matches!(err, OtpError::InvalidIdentifier(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let a = fingerprint("9876543210");
        assert_eq!(a, fingerprint("9876543210"));
        assert_ne!(a, fingerprint("9876543211"));
        assert_eq!(a.len(), 11);
        assert!(!a.contains("9876"));
    }
}

//! One-time password code.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    #[error("OTP must be exactly {expected} digits")]
    InvalidLength { expected: usize },
    #[error("OTP may only contain digits")]
    NonDigit,
}

/// A six digit one-time password as typed by the user.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Parse a code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let s = s.trim();
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }
        if s.len() != Self::LENGTH {
            return Err(OtpCodeError::InvalidLength {
                expected: Self::LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Build a code from a number in `100000..=999999`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number does not have six digits.
    pub fn from_number(n: u32) -> Result<Self, OtpCodeError> {
        Self::parse(&n.to_string())
    }

    /// Returns the digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are secrets: keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(OtpCode::parse("123456").unwrap().as_str(), "123456");
        assert_eq!(OtpCode::parse(" 000123 ").unwrap().as_str(), "000123");
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(
            OtpCode::parse("12345"),
            Err(OtpCodeError::InvalidLength { expected: 6 })
        );
        assert_eq!(
            OtpCode::parse("1234567"),
            Err(OtpCodeError::InvalidLength { expected: 6 })
        );
        assert_eq!(OtpCode::parse("12a456"), Err(OtpCodeError::NonDigit));
    }

    #[test]
    fn test_from_number() {
        assert!(OtpCode::from_number(100_000).is_ok());
        assert!(OtpCode::from_number(999_999).is_ok());
        assert!(OtpCode::from_number(99_999).is_err());
    }

    #[test]
    fn test_debug_hides_digits() {
        let code = OtpCode::parse("424242").unwrap();
        assert!(!format!("{code:?}").contains("424242"));
    }
}

//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumberError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input does not start with `+`.
    #[error("phone number must start with + and a country code")]
    MissingPlus,
    /// The first digit after `+` is zero.
    #[error("country code cannot start with 0")]
    LeadingZero,
    /// A character after `+` is not a digit.
    #[error("phone number may only contain digits after +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("phone number must have between 2 and 15 digits")]
    InvalidLength,
}

/// A phone number in E.164 format (`+` followed by 2 to 15 digits).
///
/// ```
/// use dream_collections_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("+919876543210").unwrap();
/// assert_eq!(phone.masked(), "+91987654••••");
/// assert!(PhoneNumber::parse("9876543210").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Maximum number of digits allowed by E.164.
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid E.164 number.
    pub fn parse(s: &str) -> Result<Self, PhoneNumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneNumberError::Empty);
        }

        let digits = s.strip_prefix('+').ok_or(PhoneNumberError::MissingPlus)?;

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneNumberError::InvalidCharacter);
        }

        if digits.len() < 2 || digits.len() > Self::MAX_DIGITS {
            return Err(PhoneNumberError::InvalidLength);
        }

        if digits.starts_with('0') {
            return Err(PhoneNumberError::LeadingZero);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number with its last four characters replaced by `••••`.
    ///
    /// Numbers of four characters or fewer are returned unchanged.
    #[must_use]
    pub fn masked(&self) -> String {
        let len = self.0.len();
        if len <= 4 {
            return self.0.clone();
        }
        self.0
            .get(..len - 4)
            .map_or_else(|| self.0.clone(), |head| format!("{head}••••"))
    }

    /// Returns the trailing ten digits (or all digits for shorter numbers).
    ///
    /// Used to derive usernames for accounts created through OTP login.
    #[must_use]
    pub fn last_ten_digits(&self) -> &str {
        let digits = self.0.get(1..).unwrap_or_default();
        let start = digits.len().saturating_sub(10);
        digits.get(start..).unwrap_or(digits)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(PhoneNumber::parse("+919876543210").is_ok());
        assert!(PhoneNumber::parse("+14155550100").is_ok());
        assert!(PhoneNumber::parse("+12").is_ok());
        assert!(PhoneNumber::parse(" +919876543210 ").is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(PhoneNumber::parse(""), Err(PhoneNumberError::Empty));
        assert_eq!(
            PhoneNumber::parse("919876543210"),
            Err(PhoneNumberError::MissingPlus)
        );
        assert_eq!(
            PhoneNumber::parse("+091234"),
            Err(PhoneNumberError::LeadingZero)
        );
        assert_eq!(
            PhoneNumber::parse("+91 98765"),
            Err(PhoneNumberError::InvalidCharacter)
        );
        assert_eq!(
            PhoneNumber::parse("+1"),
            Err(PhoneNumberError::InvalidLength)
        );
        assert_eq!(
            PhoneNumber::parse("+1234567890123456"),
            Err(PhoneNumberError::InvalidLength)
        );
    }

    #[test]
    fn test_masked() {
        let phone = PhoneNumber::parse("+919876543210").unwrap();
        assert_eq!(phone.masked(), "+91987654••••");
    }

    #[test]
    fn test_masked_short_number_unchanged() {
        let phone = PhoneNumber::parse("+123").unwrap();
        assert_eq!(phone.masked(), "+123");
    }

    #[test]
    fn test_last_ten_digits() {
        let phone = PhoneNumber::parse("+919876543210").unwrap();
        assert_eq!(phone.last_ten_digits(), "9876543210");

        let short = PhoneNumber::parse("+4412345").unwrap();
        assert_eq!(short.last_ten_digits(), "4412345");
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let parsed: Result<PhoneNumber, _> = serde_json::from_str("\"12345\"");
        assert!(parsed.is_err());

        let phone: PhoneNumber = serde_json::from_str("\"+919876543210\"").unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+919876543210\"");
        assert_eq!(&phone.as_str()[..3], "+91");
    }
}

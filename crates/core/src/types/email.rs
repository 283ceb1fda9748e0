//! Customer email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string is not an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email must contain a single @ symbol")]
    MultipleAtSymbols,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
    #[error("email cannot contain whitespace")]
    Whitespace,
}

/// A structurally valid email address: one local part and one domain.
///
/// Surrounding whitespace is trimmed; case is kept as entered and lookups
/// compare case-insensitively.
///
/// ```
/// use dream_collections_core::Email;
///
/// let email = Email::parse(" priya.sharma@example.com ").unwrap();
/// assert_eq!(email.as_str(), "priya.sharma@example.com");
/// assert_eq!(email.masked(), "pr•••@example.com");
/// assert!(Email::parse("priya@@example.com").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// Parse and trim an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first structural problem.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let email = input.trim();
        if email.is_empty() {
            return Err(EmailError::Empty);
        }
        if email.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if email.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = email.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::MultipleAtSymbols);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }
        Ok(Self(email.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> (&str, &str) {
        self.0.split_once('@').unwrap_or((self.0.as_str(), ""))
    }

    /// Everything before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.parts().0
    }

    /// Everything after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.parts().1
    }

    /// The address with all but the first two characters of the local part
    /// hidden, e.g. `pr•••@example.com`.
    ///
    /// Local parts of two characters or fewer are shown as they are.
    #[must_use]
    pub fn masked(&self) -> String {
        let (local, domain) = self.parts();
        if local.chars().count() <= 2 {
            return self.0.clone();
        }
        let shown: String = local.chars().take(2).collect();
        format!("{shown}•••@{domain}")
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in [
            "a@b",
            "asha.rao@dreamcollections.in",
            "orders+gold@mail.example.co.in",
            "user_9876543210@phone.dreamcollections.in",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("asha.example.com"), Err(EmailError::MissingAtSymbol));
        assert_eq!(Email::parse("asha@rao@example.com"), Err(EmailError::MultipleAtSymbols));
        assert_eq!(Email::parse("@example.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("asha@"), Err(EmailError::EmptyDomain));
        assert_eq!(Email::parse("asha rao@example.com"), Err(EmailError::Whitespace));

        let long = format!("{}@example.com", "x".repeat(Email::MAX_LENGTH));
        assert_eq!(
            Email::parse(&long),
            Err(EmailError::TooLong {
                max: Email::MAX_LENGTH
            })
        );
    }

    #[test]
    fn test_trims_and_splits() {
        let email = Email::parse("\tmeera@example.com\n").unwrap();
        assert_eq!(email.to_string(), "meera@example.com");
        assert_eq!(email.local_part(), "meera");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_masked() {
        let email = Email::parse("meera.iyer@example.com").unwrap();
        assert_eq!(email.masked(), "me•••@example.com");

        let short = Email::parse("mi@example.com").unwrap();
        assert_eq!(short.masked(), "mi@example.com");
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str("\"meera@example.com\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"meera@example.com\"");
        assert!(serde_json::from_str::<Email>("\"not-an-email\"").is_err());
    }
}

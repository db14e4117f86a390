//! Registrant email address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Mail domain of the host institute.
pub const INSTITUTE_DOMAIN: &str = "iitp.ac.in";

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
    /// No dot separating a top-level label.
    #[error("email domain must contain a dot")]
    UnqualifiedDomain,
    /// Whitespace anywhere, or a second `@`.
    #[error("email contains invalid characters")]
    InvalidCharacter,
}

/// A registrant's email address.
///
/// Registration and login only need the address to be routable: a local part,
/// an `@`, and a dotted domain. Surrounding whitespace is rejected rather than
/// trimmed so the address sent to the identity provider is exactly what was typed.
///
/// ```
/// use celesta_core::Email;
///
/// assert!(Email::parse("asha@iitp.ac.in").is_ok());
/// assert!(Email::parse("asha@localhost").is_err()); // no dot in domain
/// assert!(Email::parse(" asha@iitp.ac.in").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate and wrap `s`.
    ///
    /// # Errors
    ///
    /// Returns the first rule `s` breaks. Whitespace and a second `@` are
    /// reported before length.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.chars().any(char::is_whitespace) || s.matches('@').count() > 1 {
            return Err(EmailError::InvalidCharacter);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::MissingAtSymbol)?;
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() {
            return Err(EmailError::EmptyDomain);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::UnqualifiedDomain);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Everything before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or("", |(local, _)| local)
    }

    /// Addresses on the host institute's mail server.
    #[must_use]
    pub fn is_institute(&self) -> bool {
        self.0
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.eq_ignore_ascii_case(INSTITUTE_DOMAIN))
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
    fn test_accepts_routable_addresses() {
        for ok in [
            "2301cs42@iitp.ac.in",
            "user.name+fest@example.com",
            "a@b.c",
            "someone@mail.college.edu.in",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejections() {
        let long = format!("{}@example.com", "a".repeat(250));
        let cases = [
            ("", EmailError::Empty),
            ("no-at-symbol", EmailError::MissingAtSymbol),
            ("@iitp.ac.in", EmailError::EmptyLocalPart),
            ("asha@", EmailError::EmptyDomain),
            ("asha@localhost", EmailError::UnqualifiedDomain),
            ("asha@iitp.", EmailError::UnqualifiedDomain),
            ("asha @iitp.ac.in", EmailError::InvalidCharacter),
            ("a@b@iitp.ac.in", EmailError::InvalidCharacter),
            (long.as_str(), EmailError::TooLong { max: 254 }),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input), Err(expected), "{input:?}");
        }
    }

    #[test]
    fn test_local_part() {
        let email = Email::parse("2301cs42@iitp.ac.in").unwrap();
        assert_eq!(email.local_part(), "2301cs42");
    }

    #[test]
    fn test_is_institute() {
        assert!(Email::parse("2301cs42@IITP.ac.in").unwrap().is_institute());
        assert!(!Email::parse("asha@gmail.com").unwrap().is_institute());
        assert!(!Email::parse("asha@student.iitp.ac.in").unwrap().is_institute());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email: Email = "asha@iitp.ac.in".parse().unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"asha@iitp.ac.in\"");
        assert_eq!(email.to_string(), "asha@iitp.ac.in");
    }
}

//! Account namespace keys.

use std::fmt;

use thiserror::Error;

/// Longest accepted namespace key, in bytes.
const MAX_NAMESPACE_LEN: usize = 64;

/// Reasons a namespace key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    /// The key was empty or whitespace.
    #[error("namespace key is empty")]
    Empty,

    /// The key exceeds the length limit.
    #[error("namespace key '{key}' is longer than 64 bytes")]
    TooLong {
        /// Rejected key.
        key: String,
    },

    /// The key contains a character outside `[A-Za-z0-9_]`.
    #[error("namespace key '{key}' contains invalid character {ch:?}")]
    InvalidCharacter {
        /// Rejected key.
        key: String,
        /// First offending character.
        ch: char,
    },
}

/// Isolation key for one account's clip records (the account login).
///
/// Only ever bound as a query parameter; never spliced into SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validates and wraps a namespace key.
    ///
    /// # Errors
    ///
    /// Returns [`NamespaceError`] when the key is empty, too long, or contains
    /// characters other than ASCII letters, digits and underscore.
    pub fn parse(key: &str) -> Result<Self, NamespaceError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(NamespaceError::Empty);
        }
        if key.len() > MAX_NAMESPACE_LEN {
            return Err(NamespaceError::TooLong {
                key: key.to_string(),
            });
        }
        if let Some(ch) = key
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(NamespaceError::InvalidCharacter {
                key: key.to_string(),
                ch,
            });
        }
        Ok(Self(key.to_string()))
    }

    /// Returns the key as stored in the `namespace` column.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_accepts_login() {
        let ns = Namespace::parse("some_streamer42").unwrap();
        assert_eq!(ns.as_str(), "some_streamer42");
        assert_eq!(ns.to_string(), "some_streamer42");
    }

    #[test]
    fn test_namespace_trims_whitespace() {
        assert_eq!(Namespace::parse("  abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_namespace_rejects_empty() {
        assert_eq!(Namespace::parse("   "), Err(NamespaceError::Empty));
    }

    #[test]
    fn test_namespace_rejects_sql_metacharacters() {
        let err = Namespace::parse("abc; DROP TABLE clips").unwrap_err();
        assert!(matches!(
            err,
            NamespaceError::InvalidCharacter { ch: ';', .. }
        ));
    }

    #[test]
    fn test_namespace_rejects_overlong() {
        let key = "a".repeat(MAX_NAMESPACE_LEN + 1);
        assert!(matches!(
            Namespace::parse(&key),
            Err(NamespaceError::TooLong { .. })
        ));
    }
}

//! Implementation of [`ReviewId`].

use crate::{IdError, IdResult};
use std::{fmt, str::FromStr};

/// Shortest accepted identifier.
pub const MIN_ID_LEN: usize = 6;

/// Longest accepted identifier.
pub const MAX_ID_LEN: usize = 32;

/// Length of identifiers produced by [`ReviewId::new`].
pub const GENERATED_ID_LEN: usize = 12;

/// A validated review session identifier.
///
/// Once constructed, the contained string is guaranteed to satisfy [`ReviewId::is_valid`], so
/// it can be used as a storage prefix without further checks.
///
/// # Construction
/// - [`ReviewId::new`] allocates a fresh identifier for a new session.
/// - [`ReviewId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReviewId(String);

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewId {
    /// Generates a new identifier from a random v4 UUID.
    pub fn new() -> Self {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        Self(simple[..GENERATED_ID_LEN].to_string())
    }

    /// Validates an identifier supplied from outside the process.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidInput`] if `input` is not 6 to 32 characters drawn from
    /// letters, digits, `_` and `-`.
    pub fn parse(input: &str) -> IdResult<Self> {
        if Self::is_valid(input) {
            return Ok(Self(input.to_string()));
        }
        Err(IdError::InvalidInput(format!(
            "identifier must be {MIN_ID_LEN}-{MAX_ID_LEN} characters of [A-Za-z0-9_-], got: '{input}'"
        )))
    }

    /// Returns true if `input` is an acceptable identifier.
    ///
    /// This is purely syntactic and cheap enough to call on every request.
    pub fn is_valid(input: &str) -> bool {
        (MIN_ID_LEN..=MAX_ID_LEN).contains(&input.len())
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'-'))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReviewId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ReviewId {
    type Err = IdError;

    /// Equivalent to [`ReviewId::parse`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReviewId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ReviewId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ReviewId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ReviewId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_generates_valid_id() {
        let id = ReviewId::new();
        assert_eq!(id.as_str().len(), GENERATED_ID_LEN);
        assert!(ReviewId::is_valid(id.as_str()));
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_new_does_not_repeat() {
        let ids: HashSet<ReviewId> = (0..256).map(|_| ReviewId::new()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn test_length_boundaries() {
        assert!(!ReviewId::is_valid(&"a".repeat(5)));
        assert!(ReviewId::is_valid(&"a".repeat(6)));
        assert!(ReviewId::is_valid(&"a".repeat(32)));
        assert!(!ReviewId::is_valid(&"a".repeat(33)));
        assert!(!ReviewId::is_valid(""));
    }

    #[test]
    fn test_character_class() {
        assert!(ReviewId::is_valid("Abc_123-xyz"));
        assert!(ReviewId::is_valid("______"));
        assert!(ReviewId::is_valid("------"));
        for bad in [
            "abc/def",
            "abc.def",
            "abc def",
            "abc%2e%2e",
            "../../x",
            "abcdé1",
            "abc\\def",
            "abcdef\n",
        ] {
            assert!(!ReviewId::is_valid(bad), "'{bad}' should be rejected");
        }
    }

    #[test]
    fn test_parse_error_message() {
        match ReviewId::parse("bad") {
            Err(IdError::InvalidInput(msg)) => assert!(msg.contains("6-32")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_from_str_and_display() {
        let id: ReviewId = "review_01".parse().unwrap();
        assert_eq!(id.to_string(), "review_01");
        assert!("x".parse::<ReviewId>().is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: ReviewId = serde_json::from_str("\"abcdef123\"").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abcdef123\"");

        let bad: Result<ReviewId, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }
}

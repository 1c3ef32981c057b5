//! Upload path normalization.
//!
//! Every storage write and read is keyed by a path that started life as an archive member name
//! or a request field. [`normalize_upload_path`] is the single gate those strings pass through.
//!
//! Rules, applied in order:
//! 1. backslashes become forward slashes
//! 2. one leading `./` is removed
//! 3. one leading `/` is removed
//! 4. the result must be non-empty
//! 5. no segment may be empty, `.` or `..`
//!
//! The output contains no leading separator, no dot segments and no doubled separators, so
//! normalizing it a second time is the identity.

use std::fmt;

/// Errors produced when a raw path cannot be used as an upload path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing remained after stripping the leading `./` or `/`.
    #[error("path is empty")]
    Empty,

    /// A segment was empty, `.` or `..`.
    #[error("path contains an invalid segment: '{0}'")]
    InvalidSegment(String),
}

/// A validated, forward-slash separated path relative to a review session root.
///
/// Only [`normalize_upload_path`] (or deserialization, which calls it) can produce one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelativePath(String);

/// Normalizes an untrusted path into a [`RelativePath`].
///
/// # Errors
///
/// Returns [`PathError::Empty`] when nothing is left after cleaning, or
/// [`PathError::InvalidSegment`] when any segment is empty, `.` or `..`.
pub fn normalize_upload_path(raw: &str) -> Result<RelativePath, PathError> {
    let slashed = raw.replace('\\', "/");
    let cleaned = slashed.strip_prefix("./").unwrap_or(&slashed);
    let cleaned = cleaned.strip_prefix('/').unwrap_or(cleaned);

    if cleaned.is_empty() {
        return Err(PathError::Empty);
    }

    if let Some(bad) = cleaned
        .split('/')
        .find(|segment| segment.is_empty() || *segment == "." || *segment == "..")
    {
        return Err(PathError::InvalidSegment(bad.to_string()));
    }

    Ok(RelativePath(cleaned.to_string()))
}

impl RelativePath {
    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns the first segment (the whole path for a top-level file).
    pub fn first_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Returns the last segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True when the path lives inside at least one folder.
    pub fn is_nested(&self) -> bool {
        self.0.contains('/')
    }

    /// True when the path ends in `.html`, ignoring case.
    pub fn is_html(&self) -> bool {
        self.0.to_ascii_lowercase().ends_with(".html")
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for RelativePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_upload_path(s)
    }
}

impl serde::Serialize for RelativePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RelativePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        normalize_upload_path(&s).map_err(serde::de::Error::custom)
    }
}

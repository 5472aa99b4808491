//! Validated package paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A package path such as `fmt` or `net/http`.
///
/// Paths key the archive cache and are spliced into store URLs, so the
/// accepted alphabet is deliberately narrow: `/`-separated segments of
/// ASCII alphanumerics plus `_`, `-` and `.`, with no empty, `.` or `..`
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PkgPath(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PkgPathError {
    #[error("package path must not be empty")]
    Empty,
    #[error("package path contains invalid character {0:?}")]
    InvalidChar(char),
    #[error("package path has an empty segment")]
    EmptySegment,
    #[error("package path segments must not be `.` or `..`")]
    RelativeSegment,
}

impl PkgPath {
    pub fn new(path: impl Into<String>) -> Result<Self, PkgPathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PkgPathError::Empty);
        }
        if let Some(bad) = path
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')))
        {
            return Err(PkgPathError::InvalidChar(bad));
        }
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(PkgPathError::EmptySegment);
            }
            if segment == "." || segment == ".." {
                return Err(PkgPathError::RelativeSegment);
            }
        }
        Ok(Self(path))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PkgPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PkgPath {
    type Err = PkgPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PkgPath {
    type Error = PkgPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PkgPath> for String {
    fn from(path: PkgPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::{PkgPath, PkgPathError};

    #[test]
    fn accepts_plain_and_nested_paths() {
        assert_eq!(PkgPath::new("fmt").unwrap().as_str(), "fmt");
        assert_eq!(PkgPath::new("net/http").unwrap().as_str(), "net/http");
        assert_eq!(PkgPath::new("a-b_c.d/e2").unwrap().as_str(), "a-b_c.d/e2");
    }

    #[test]
    fn rejects_empty_and_empty_segments() {
        assert_eq!(PkgPath::new(""), Err(PkgPathError::Empty));
        assert_eq!(PkgPath::new("a//b"), Err(PkgPathError::EmptySegment));
        assert_eq!(PkgPath::new("/a"), Err(PkgPathError::EmptySegment));
        assert_eq!(PkgPath::new("a/"), Err(PkgPathError::EmptySegment));
    }

    #[test]
    fn rejects_traversal_segments() {
        assert_eq!(PkgPath::new("."), Err(PkgPathError::RelativeSegment));
        assert_eq!(PkgPath::new("a/../b"), Err(PkgPathError::RelativeSegment));
    }

    #[test]
    fn rejects_whitespace_and_specials() {
        assert_eq!(PkgPath::new("a b"), Err(PkgPathError::InvalidChar(' ')));
        assert_eq!(PkgPath::new("a\\b"), Err(PkgPathError::InvalidChar('\\')));
    }
}

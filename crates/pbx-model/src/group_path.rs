//! Group paths for addressing folders in the navigator
//!
//! Provides [`GroupPath`], the `/`-separated chain of group display names
//! from the project's main group down to one group. Callers use it to say
//! "put this file under `App/Features/Auth`" without knowing identifiers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Chain of group names below the main group
///
/// # Examples
/// - `App/Features/Auth` → `["App", "Features", "Auth"]`
/// - the empty string is the main group itself
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// The main group
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Display for GroupPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for GroupPath {
    type Err = GroupPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let segments = trimmed
            .split('/')
            .map(|seg| {
                if seg.is_empty() {
                    Err(GroupPathError::EmptySegment(s.to_string()))
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self(segments))
    }
}

impl From<Vec<String>> for GroupPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// Errors related to group paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupPathError {
    /// `a//b`
    #[error("group path '{0}' contains an empty segment")]
    EmptySegment(String),
}

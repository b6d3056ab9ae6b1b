//! Object identifiers
//!
//! Identifiers are opaque tokens (24 hex digits in manifests Xcode writes).
//! They are the only way objects refer to each other.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

/// Identifier of one object in the `objects` table
///
/// Equality is plain token equality; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wrap a token
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token looks like a generated identifier (hex digits only)
    #[must_use]
    pub fn is_hex(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for ObjectId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_token_equality() {
        assert_eq!(ObjectId::from("0A1B"), ObjectId::new("0A1B".to_string()));
        assert_ne!(ObjectId::from("0A1B"), ObjectId::from("0a1b"));
    }

    #[test]
    fn hex_detection() {
        assert!(ObjectId::from("8A2F00C1D2E3F40516273849").is_hex());
        assert!(!ObjectId::from("GROUP_1").is_hex());
        assert!(!ObjectId::from("").is_hex());
    }

    #[test]
    fn borrow_as_str_in_sets() {
        let mut set = HashSet::new();
        set.insert(ObjectId::from("ABC"));
        assert!(set.contains("ABC"));
    }

    #[test]
    fn serde_transparent() {
        let id = ObjectId::from("ABC");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ABC\"");
    }
}

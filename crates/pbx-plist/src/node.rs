//! Structural view of a parsed document
//!
//! [`Node`] drops trivia, quoting and annotations. Two documents are
//! structurally equal when their node trees are equal.

use serde::Serialize;

/// Trivia-free tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    /// Unescaped string value
    Scalar(String),
    /// Ordered items
    List(Vec<Node>),
    /// Ordered `(key, value)` pairs
    Object(Vec<(String, Node)>),
}

impl Node {
    /// Field lookup on an object node
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Self::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Scalar text
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

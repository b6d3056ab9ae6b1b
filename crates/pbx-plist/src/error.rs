//! Error types for the property-list reader
//!
//! A [`SyntaxError`] is fatal for a document: no partial tree is produced.

use std::fmt::{self, Display, Formatter};

/// Location of a byte offset within the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Byte offset from the start of the input
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column (in bytes)
    pub column: usize,
}

impl Position {
    /// Compute line/column for a byte offset in `source`
    #[must_use]
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|b| **b == b'\n').count() + 1;
        let line_start = before
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |i| i + 1);
        Self {
            offset,
            line,
            column: offset - line_start + 1,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (byte {})", self.line, self.column, self.offset)
    }
}

/// Malformed input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("syntax error at {position}: expected {expected}, found {found}")]
pub struct SyntaxError {
    /// Where parsing stopped
    pub position: Position,
    /// What the reader was looking for
    pub expected: String,
    /// What it saw instead
    pub found: String,
}

impl SyntaxError {
    /// Create syntax error at `offset` of `source`
    pub fn expected(source: &str, offset: usize, expected: impl Into<String>) -> Self {
        let found = match source[offset.min(source.len())..].chars().next() {
            Some(c) => format!("{c:?}"),
            None => "end of input".to_string(),
        };
        Self {
            position: Position::locate(source, offset),
            expected: expected.into(),
            found,
        }
    }
}

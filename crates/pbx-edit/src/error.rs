//! Error types for editing sessions
//!
//! Provides error handling for:
//! - Open (file → session)
//! - Edit operations (one mutation on the working copy)
//! - Commit (session → file)

use pbx_model::{ModelError, ObjectId, Report};
use pbx_plist::{ContentHash, SyntaxError};
use std::path::PathBuf;

/// Errors while opening a document
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// IO error during read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being opened
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File exceeds the configured size cap
    #[error("{path} is {size} bytes, limit is {limit}")]
    TooLarge {
        /// File being opened
        path: PathBuf,
        /// Its size
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// Text is not valid manifest syntax
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// No usable `objects` table
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl OpenError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from a single mutation
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// A FileReference already resolves to the requested location
    #[error("{path} is already in the project as {existing}")]
    AlreadyExists {
        /// Requested path
        path: String,
        /// The FileReference occupying it
        existing: ObjectId,
    },

    /// No FileReference matches the request
    #[error("no file reference matches {0}")]
    NotFound(String),

    /// Group or phase identifier does not resolve
    #[error("{kind} not found: {id}")]
    TargetNotFound {
        /// `group` or `phase`
        kind: &'static str,
        /// What was asked for
        id: String,
    },

    /// A field the model does not interpret still points at the file
    #[error("{id} is still referenced by {holder} ({field})")]
    InUse {
        /// The file
        id: ObjectId,
        /// Object holding the reference
        holder: ObjectId,
        /// Field name
        field: String,
    },

    /// Path argument cannot be used
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Offending argument
        path: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The edit produced an inconsistent graph; the working copy is gone
    #[error("integrity violation, edit discarded\n{0}")]
    IntegrityViolation(Report),

    /// An earlier call hit an integrity violation
    #[error("session unusable after an integrity violation; re-open the document")]
    Poisoned,

    /// Re-reading the edited tree failed
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EditError {
    /// Create target-not-found error for a group
    pub fn group_not_found(id: impl Into<String>) -> Self {
        Self::TargetNotFound {
            kind: "group",
            id: id.into(),
        }
    }

    /// Create target-not-found error for a phase
    pub fn phase_not_found(id: impl Into<String>) -> Self {
        Self::TargetNotFound {
            kind: "phase",
            id: id.into(),
        }
    }

    /// Precondition failures: the tree is untouched and the session usable
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. }
                | Self::NotFound(_)
                | Self::TargetNotFound { .. }
                | Self::InUse { .. }
                | Self::InvalidPath { .. }
        )
    }
}

/// Errors during commit; the file on disk is left as it was
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// IO error during write
    #[error("io error writing {path}: {source}")]
    Io {
        /// Destination
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file changed on disk since it was opened
    #[error("{path} changed on disk since it was opened (expected {expected}, found {actual})")]
    Stale {
        /// Destination
        path: PathBuf,
        /// Checksum at open
        expected: ContentHash,
        /// Checksum now
        actual: ContentHash,
    },

    /// Session was created from text and has no file to write back to
    #[error("session has no backing file; use commit_to")]
    NoPath,

    /// An integrity violation discarded the working copy
    #[error("session unusable after an integrity violation; nothing to commit")]
    Poisoned,
}

impl WriteError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for edit operations
pub type EditResult<T> = Result<T, EditError>;

//! Safe mutation of project manifests
//!
//! Opens a manifest into a [`Session`], applies edits that keep the object
//! graph consistent, and writes the result back atomically.
//!
//! # Overview
//!
//! - **Session**: owns the document; every operation is all-or-nothing
//! - **Operations**: add, remove (with cascade), dedupe, retarget, rename,
//!   phase normalization and dangling-reference pruning
//! - **Policies**: pluggable survivor choice for dedupe
//! - **Commit**: stale-file detection plus temp-file-and-rename writes
//!
//! # Example
//!
//! ```rust
//! use pbx_edit::{EditConfig, RemoveTarget, Session};
//! use pbx_model::SourceTree;
//!
//! let text = "{ objects = {
//!     G1 = {isa = PBXGroup; children = (); sourceTree = \"<group>\"; };
//!     P1 = {isa = PBXSourcesBuildPhase; files = (); };
//! }; }";
//! let mut session = Session::from_text(text, EditConfig::new().with_seed(7)).unwrap();
//! let added = session.add_file("Foo.swift", &SourceTree::Group, "G1", "P1").unwrap();
//! assert_eq!(session.model().files_named("Foo.swift"), &[added.file_ref.clone()]);
//!
//! session.remove_file(&RemoveTarget::id(added.file_ref)).unwrap();
//! assert!(session.model().files_named("Foo.swift").is_empty());
//! ```

#![warn(unreachable_pub)]

pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod ids;
pub mod policy;
mod sections;
pub mod session;

// Re-exports
pub use backup::BackupGuard;
pub use config::{EditConfig, MAX_ID_WIDTH, MIN_ID_WIDTH};
pub use engine::{AddRequest, Added, DedupeGroup, RemoveTarget};
pub use error::{EditError, EditResult, OpenError, WriteError};
pub use ids::IdAllocator;
pub use policy::{DedupePolicy, EarliestIdentifier, LongestPath, PolicyKind};
pub use session::{BatchOutcome, Session, SessionStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for editing sessions
    pub use crate::{
        AddRequest, DedupePolicy, EditConfig, EditError, OpenError, RemoveTarget, Session,
        WriteError,
    };
    pub use pbx_model::{GroupPath, ObjectId, SourceTree};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

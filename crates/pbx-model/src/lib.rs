//! Project manifest entity model
//!
//! Typed, indexed views over a parsed manifest, plus the integrity
//! validator that the mutation engine uses as its post-condition.
//!
//! # Overview
//!
//! - **ObjectId**: opaque identifier; the only cross-reference mechanism
//! - **Model**: FileReference / BuildFile / Group / BuildPhase views with
//!   identifier, filename, parent and membership indexes
//! - **GroupPath**: address a group by its display-name chain
//! - **check**: dangling references, duplicates, multi-parent files,
//!   repeated memberships and phase conflicts
//!
//! # Example
//!
//! ```rust
//! use pbx_model::{check, Model};
//!
//! let doc = pbx_plist::parse(
//!     "{ objects = { F1 = {isa = PBXFileReference; path = A.swift; }; }; }",
//! ).unwrap();
//! let model = Model::build(&doc).unwrap();
//! assert_eq!(model.files_named("A.swift").len(), 1);
//! assert!(check(&model).is_clean());
//! ```

#![warn(missing_docs)]

pub mod entity;
pub mod error;
pub mod group_path;
pub mod id;
pub mod model;
pub mod validation;

// Re-exports
pub use entity::{
    file_name_of, infer_file_type, isa, BuildFile, BuildPhase, Entity, FileReference, Group,
    GroupKind, PhaseKind, SourceTree,
};
pub use error::{ModelError, SchemaError};
pub use group_path::{GroupPath, GroupPathError};
pub use id::ObjectId;
pub use model::{normalize_path, objects_table, ExternalRef, Model, ObjectInfo, ResolvedPath};
pub use validation::{
    check, duplicate_files, DanglingRef, DuplicateBasis, DuplicateFiles, DuplicateMembership,
    MultiParent, PhaseConflict, Report,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for model consumers
    pub use crate::{
        check, DuplicateBasis, FileReference, Group, GroupPath, Model, ObjectId, Report,
        ResolvedPath, SourceTree,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

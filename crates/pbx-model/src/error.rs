//! Error types for the entity model
//!
//! A [`ModelError`] means the document has no usable `objects` table at all.
//! A [`SchemaError`] concerns one entity; the model skips it and carries on.

use crate::id::ObjectId;
use serde::Serialize;

/// A recognized-kind object whose shape the model cannot interpret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("object {id} ({isa}): {reason}")]
pub struct SchemaError {
    /// Offending object
    pub id: ObjectId,
    /// Its `isa`
    pub isa: String,
    /// What is wrong
    pub reason: String,
}

impl SchemaError {
    /// Create schema error for object `id`
    pub fn new(id: &ObjectId, isa: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.clone(),
            isa: isa.into(),
            reason: reason.into(),
        }
    }
}

/// Document-level structure problems
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Root value is not `{ ... }`
    #[error("document root is a {0}, expected an object")]
    RootNotObject(&'static str),

    /// No `objects = { ... };` table
    #[error("document has no `objects` table")]
    MissingObjects,

    /// Strict build hit a schema error
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

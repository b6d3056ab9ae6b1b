//! Deduplication tie-break policies
//!
//! A policy picks the survivor among FileReferences judged to be the same
//! file. Both built-in policies are heuristics: the longest path is often,
//! not always, the correct one.

use pbx_model::{Model, ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Survivor selection for one duplicate set
pub trait DedupePolicy {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Pick the FileReference to keep; `None` leaves the set alone
    fn choose(&self, model: &Model, candidates: &[ObjectId]) -> Option<ObjectId>;
}

/// Keep the copy whose resolved path is longest
///
/// Ties go to the earliest entry in document order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestPath;

impl DedupePolicy for LongestPath {
    fn name(&self) -> &'static str {
        "longest_path"
    }

    fn choose(&self, model: &Model, candidates: &[ObjectId]) -> Option<ObjectId> {
        candidates
            .iter()
            .filter(|id| model.file_ref(id).is_some())
            .map(|id| {
                let len = model.resolved_path(id).map_or(0, |p| p.path.len());
                let order = model.order_of(id).unwrap_or(usize::MAX);
                (id, len, order)
            })
            // longest first, then earliest
            .min_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)))
            .map(|(id, _, _)| id.clone())
    }
}

/// Keep the copy that appears first in the document
#[derive(Debug, Clone, Copy, Default)]
pub struct EarliestIdentifier;

impl DedupePolicy for EarliestIdentifier {
    fn name(&self) -> &'static str {
        "earliest_identifier"
    }

    fn choose(&self, model: &Model, candidates: &[ObjectId]) -> Option<ObjectId> {
        candidates
            .iter()
            .filter_map(|id| model.order_of(id).map(|order| (order, id)))
            .filter(|(_, id)| model.file_ref(id).is_some())
            .min_by_key(|(order, _)| *order)
            .map(|(_, id)| id.clone())
    }
}

/// Serializable selector for the built-in policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// [`LongestPath`]
    #[default]
    LongestPath,
    /// [`EarliestIdentifier`]
    EarliestIdentifier,
}

impl PolicyKind {
    /// The policy this selector names
    #[must_use]
    pub fn policy(self) -> &'static dyn DedupePolicy {
        match self {
            Self::LongestPath => &LongestPath,
            Self::EarliestIdentifier => &EarliestIdentifier,
        }
    }
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy().name())
    }
}

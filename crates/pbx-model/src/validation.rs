//! Integrity validation for the entity graph
//!
//! [`check`] is a pure function over a [`Model`]. Its [`Report`] lists every
//! referential problem the graph currently has. The mutation engine runs it
//! after each call and compares the result against the report taken when
//! the document was opened.

use crate::entity::{isa, GroupKind};
use crate::id::ObjectId;
use crate::model::{Model, ResolvedPath};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// An identifier that resolves to nothing usable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    /// Entity holding the reference
    pub holder: ObjectId,
    /// Field the reference sits in
    pub field: &'static str,
    /// Missing target
    pub target: ObjectId,
}

/// How two FileReferences were judged to be the same file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateBasis {
    /// Same anchored, normalized location
    ResolvedPath,
    /// Same last path component only
    FileName,
}

/// FileReferences that denote the same logical file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateFiles {
    /// Resolved path or file name
    pub key: String,
    /// Which comparison matched
    pub basis: DuplicateBasis,
    /// Owning identifiers in document order
    pub ids: Vec<ObjectId>,
}

/// A FileReference listed by more than one Group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiParent {
    /// The file
    pub file_ref: ObjectId,
    /// Every group listing it
    pub groups: Vec<ObjectId>,
}

/// One identifier listed more than once in the same container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMembership {
    /// Group or BuildPhase
    pub holder: ObjectId,
    /// Repeated identifier
    pub member: ObjectId,
    /// How many times it is listed
    pub count: usize,
}

/// Two BuildFiles for the same FileReference inside one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseConflict {
    /// The phase
    pub phase: ObjectId,
    /// The file both wrappers point at
    pub file_ref: ObjectId,
    /// The competing BuildFiles
    pub build_files: Vec<ObjectId>,
}

/// Result of [`check`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    /// References to missing objects
    pub dangling_references: Vec<DanglingRef>,
    /// Same logical file under several identifiers
    pub duplicate_files: Vec<DuplicateFiles>,
    /// Files with more than one parent group
    pub multi_parent_files: Vec<MultiParent>,
    /// Repeated entries in one list
    pub duplicate_memberships: Vec<DuplicateMembership>,
    /// Competing BuildFiles in one phase
    pub phase_conflicts: Vec<PhaseConflict>,
}

impl Report {
    /// Nothing at all to report
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dangling_references.is_empty()
            && self.duplicate_files.is_empty()
            && self.multi_parent_files.is_empty()
            && self.duplicate_memberships.is_empty()
            && self.phase_conflicts.is_empty()
    }

    /// Total number of entries
    #[must_use]
    pub fn problem_count(&self) -> usize {
        self.dangling_references.len()
            + self.duplicate_files.len()
            + self.multi_parent_files.len()
            + self.duplicate_memberships.len()
            + self.phase_conflicts.len()
    }

    /// Only the entries that make a graph unfit to commit
    ///
    /// Files sharing a bare name in different folders are legal, so
    /// [`DuplicateBasis::FileName`] entries are dropped here; they remain
    /// input for deduplication.
    #[must_use]
    pub fn blocking(&self) -> Self {
        Self {
            duplicate_files: self
                .duplicate_files
                .iter()
                .filter(|d| d.basis == DuplicateBasis::ResolvedPath)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Whether [`Report::blocking`] would be non-empty
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        !self.blocking().is_clean()
    }

    /// Blocking entries not already present in `baseline`
    ///
    /// An entry counts as present when the baseline holds the same problem
    /// with at least the same members, so shrinking an inherited problem is
    /// never reported as new.
    #[must_use]
    pub fn introduced_since(&self, baseline: &Self) -> Self {
        let current = self.blocking();
        Self {
            dangling_references: current
                .dangling_references
                .into_iter()
                .filter(|d| !baseline.dangling_references.contains(d))
                .collect(),
            duplicate_files: current
                .duplicate_files
                .into_iter()
                .filter(|d| {
                    !baseline
                        .duplicate_files
                        .iter()
                        .any(|b| b.basis == d.basis && is_subset(&d.ids, &b.ids))
                })
                .collect(),
            multi_parent_files: current
                .multi_parent_files
                .into_iter()
                .filter(|m| {
                    !baseline
                        .multi_parent_files
                        .iter()
                        .any(|b| b.file_ref == m.file_ref && is_subset(&m.groups, &b.groups))
                })
                .collect(),
            duplicate_memberships: current
                .duplicate_memberships
                .into_iter()
                .filter(|m| {
                    !baseline.duplicate_memberships.iter().any(|b| {
                        b.holder == m.holder && b.member == m.member && m.count <= b.count
                    })
                })
                .collect(),
            phase_conflicts: current
                .phase_conflicts
                .into_iter()
                .filter(|c| {
                    !baseline.phase_conflicts.iter().any(|b| {
                        b.phase == c.phase
                            && b.file_ref == c.file_ref
                            && is_subset(&c.build_files, &b.build_files)
                    })
                })
                .collect(),
        }
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn is_subset(small: &[ObjectId], big: &[ObjectId]) -> bool {
    small.iter().all(|id| big.contains(id))
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("no integrity problems");
        }
        writeln!(f, "{} integrity problem(s):", self.problem_count())?;
        for d in &self.dangling_references {
            writeln!(f, "  dangling: {} {} -> {}", d.holder, d.field, d.target)?;
        }
        for d in &self.duplicate_files {
            let basis = match d.basis {
                DuplicateBasis::ResolvedPath => "path",
                DuplicateBasis::FileName => "name",
            };
            writeln!(f, "  duplicate {basis} {}: {}", d.key, join(&d.ids))?;
        }
        for m in &self.multi_parent_files {
            writeln!(f, "  multiple parents: {} in {}", m.file_ref, join(&m.groups))?;
        }
        for m in &self.duplicate_memberships {
            writeln!(f, "  repeated: {} listed {}x in {}", m.member, m.count, m.holder)?;
        }
        for c in &self.phase_conflicts {
            writeln!(
                f,
                "  phase conflict: {} has {} for {}",
                c.phase,
                join(&c.build_files),
                c.file_ref
            )?;
        }
        Ok(())
    }
}

fn join(ids: &[ObjectId]) -> String {
    ids.iter().map(ObjectId::as_str).collect::<Vec<_>>().join(", ")
}

/// Compute every integrity problem of `model`
#[must_use]
pub fn check(model: &Model) -> Report {
    let mut report = Report::default();

    for group in model.groups() {
        for child in &group.children {
            if !model.contains(child) {
                report.dangling_references.push(DanglingRef {
                    holder: group.id.clone(),
                    field: "children",
                    target: child.clone(),
                });
            }
        }
        report
            .duplicate_memberships
            .extend(repeated(&group.id, &group.children));
    }

    for bf in model.build_files() {
        let targets = [("fileRef", &bf.file_ref), ("productRef", &bf.product_ref)];
        for (field, target) in targets {
            if let Some(target) = target {
                if !model.contains(target) {
                    report.dangling_references.push(DanglingRef {
                        holder: bf.id.clone(),
                        field,
                        target: target.clone(),
                    });
                }
            }
        }
    }

    for phase in model.phases() {
        let mut by_file: BTreeMap<(usize, ObjectId), Vec<ObjectId>> = BTreeMap::new();
        for file in &phase.files {
            if model.isa_of(file) != Some(isa::BUILD_FILE) {
                report.dangling_references.push(DanglingRef {
                    holder: phase.id.clone(),
                    field: "files",
                    target: file.clone(),
                });
                continue;
            }
            let Some(target) = model.build_file(file).and_then(|bf| bf.file_ref.as_ref()) else {
                continue;
            };
            let order = model.order_of(target).unwrap_or(usize::MAX);
            let listed = by_file.entry((order, target.clone())).or_default();
            if !listed.contains(file) {
                listed.push(file.clone());
            }
        }
        report
            .duplicate_memberships
            .extend(repeated(&phase.id, &phase.files));
        for ((_, file_ref), build_files) in by_file {
            if build_files.len() > 1 {
                report.phase_conflicts.push(PhaseConflict {
                    phase: phase.id.clone(),
                    file_ref,
                    build_files,
                });
            }
        }
    }

    for fr in model.file_refs() {
        let parents = model.parents_of(&fr.id);
        if parents.len() > 1 {
            report.multi_parent_files.push(MultiParent {
                file_ref: fr.id.clone(),
                groups: parents.to_vec(),
            });
        }
    }

    report.duplicate_files = duplicate_files(model);
    report
}

/// Duplicate FileReferences, by resolved path first, then by file name
#[must_use]
pub fn duplicate_files(model: &Model) -> Vec<DuplicateFiles> {
    let mut out = Vec::new();

    let mut by_path: IndexMap<ResolvedPath, Vec<ObjectId>> = IndexMap::new();
    for fr in model.file_refs() {
        if let Some(resolved) = model.resolved_path(&fr.id) {
            by_path.entry(resolved).or_default().push(fr.id.clone());
        }
    }
    out.extend(
        by_path
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(path, ids)| DuplicateFiles {
                key: path.to_string(),
                basis: DuplicateBasis::ResolvedPath,
                ids,
            }),
    );

    let mut names: Vec<(usize, &str, Vec<ObjectId>)> = model
        .file_names()
        .filter_map(|(name, ids)| {
            let ids: Vec<ObjectId> = ids
                .iter()
                .filter(|id| !is_localization(model, id))
                .cloned()
                .collect();
            let first = ids.first().and_then(|id| model.order_of(id))?;
            (ids.len() > 1).then_some((first, name, ids))
        })
        .collect();
    names.sort_by_key(|(order, _, _)| *order);
    out.extend(names.into_iter().map(|(_, name, ids)| DuplicateFiles {
        key: name.to_string(),
        basis: DuplicateBasis::FileName,
        ids,
    }));
    out
}

/// Children of variant groups share a name by construction
fn is_localization(model: &Model, id: &ObjectId) -> bool {
    model
        .parents_of(id)
        .iter()
        .any(|p| model.group(p).is_some_and(|g| g.kind == GroupKind::Variant))
}

fn repeated(holder: &ObjectId, members: &[ObjectId]) -> Vec<DuplicateMembership> {
    let mut seen: Vec<(&ObjectId, usize)> = Vec::new();
    for member in members {
        match seen.iter_mut().find(|(id, _)| *id == member) {
            Some((_, count)) => *count += 1,
            None => seen.push((member, 1)),
        }
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(member, count)| DuplicateMembership {
            holder: holder.clone(),
            member: member.clone(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pbx_plist::parse;
    use pretty_assertions::assert_eq;

    fn report(text: &str) -> Report {
        check(&Model::build(&parse(text).unwrap()).unwrap())
    }

    const CLEAN: &str = "{ objects = {
        B1 = {isa = PBXBuildFile; fileRef = F1; };
        F1 = {isa = PBXFileReference; path = A.swift; sourceTree = \"<group>\"; };
        G1 = {isa = PBXGroup; children = (F1,); sourceTree = \"<group>\"; };
        P1 = {isa = PBXSourcesBuildPhase; files = (B1,); };
    }; }";

    #[test]
    fn clean_document() {
        let r = report(CLEAN);
        assert!(r.is_clean());
        assert_eq!(r.to_string(), "no integrity problems");
    }

    #[test]
    fn dangling_in_every_holder() {
        let r = report(
            "{ objects = {
                B1 = {isa = PBXBuildFile; fileRef = GONE1; };
                G1 = {isa = PBXGroup; children = (GONE2,); };
                P1 = {isa = PBXSourcesBuildPhase; files = (GONE3,); };
            }; }",
        );
        let targets: Vec<&str> = r
            .dangling_references
            .iter()
            .map(|d| d.target.as_str())
            .collect();
        assert_eq!(targets, vec!["GONE2", "GONE1", "GONE3"]);
        assert_eq!(r.dangling_references[1].field, "fileRef");
    }

    #[test]
    fn phase_entry_must_be_a_build_file() {
        let r = report(
            "{ objects = {
                F1 = {isa = PBXFileReference; path = A.swift; };
                P1 = {isa = PBXSourcesBuildPhase; files = (F1,); };
            }; }",
        );
        assert_eq!(r.dangling_references.len(), 1);
        assert_eq!(r.dangling_references[0].holder.as_str(), "P1");
    }

    #[test]
    fn repeated_phase_entry_is_a_duplicate_membership() {
        let r = report(
            "{ objects = {
                B1 = {isa = PBXBuildFile; fileRef = F1; };
                F1 = {isa = PBXFileReference; path = A.swift; };
                P1 = {isa = PBXSourcesBuildPhase; files = (B1, B1,); };
                P2 = {isa = PBXSourcesBuildPhase; files = (B1,); };
            }; }",
        );
        assert_eq!(
            r.duplicate_memberships,
            vec![DuplicateMembership {
                holder: ObjectId::from("P1"),
                member: ObjectId::from("B1"),
                count: 2,
            }]
        );
        assert!(r.phase_conflicts.is_empty());
    }

    #[test]
    fn two_build_files_in_one_phase_conflict() {
        let r = report(
            "{ objects = {
                B1 = {isa = PBXBuildFile; fileRef = F1; };
                B2 = {isa = PBXBuildFile; fileRef = F1; };
                F1 = {isa = PBXFileReference; path = A.swift; };
                P1 = {isa = PBXSourcesBuildPhase; files = (B1, B2,); };
                P2 = {isa = PBXSourcesBuildPhase; files = (B1,); };
            }; }",
        );
        assert_eq!(r.phase_conflicts.len(), 1);
        assert_eq!(r.phase_conflicts[0].phase.as_str(), "P1");
        assert_eq!(r.phase_conflicts[0].build_files.len(), 2);
    }

    #[test]
    fn multi_parent_file() {
        let r = report(
            "{ objects = {
                F1 = {isa = PBXFileReference; path = A.swift; sourceTree = SOURCE_ROOT; };
                G1 = {isa = PBXGroup; children = (F1,); };
                G2 = {isa = PBXGroup; children = (F1,); };
            }; }",
        );
        assert_eq!(r.multi_parent_files.len(), 1);
        assert_eq!(r.multi_parent_files[0].groups.len(), 2);
    }

    #[test]
    fn duplicates_by_path_and_by_name() {
        let r = report(
            "{ objects = {
                F1 = {isa = PBXFileReference; path = A.swift; sourceTree = \"<group>\"; };
                F2 = {isa = PBXFileReference; path = ./A.swift; sourceTree = \"<group>\"; };
                F3 = {isa = PBXFileReference; path = Sub/B.swift; sourceTree = \"<group>\"; };
                F4 = {isa = PBXFileReference; path = B.swift; sourceTree = \"<group>\"; };
                G1 = {isa = PBXGroup; children = (F1, F2, F3, F4,); };
            }; }",
        );
        let summary: Vec<(&str, DuplicateBasis, usize)> = r
            .duplicate_files
            .iter()
            .map(|d| (d.key.as_str(), d.basis, d.ids.len()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A.swift", DuplicateBasis::ResolvedPath, 2),
                ("A.swift", DuplicateBasis::FileName, 2),
                ("B.swift", DuplicateBasis::FileName, 2),
            ]
        );
        assert_eq!(r.blocking().duplicate_files.len(), 1);
    }

    #[test]
    fn same_text_under_different_anchors_is_not_a_path_duplicate() {
        let r = report(
            "{ objects = {
                F1 = {isa = PBXFileReference; path = Foo.swift; sourceTree = \"<absolute>\"; };
                F2 = {isa = PBXFileReference; path = Foo.swift; sourceTree = SOURCE_ROOT; };
                G1 = {isa = PBXGroup; children = (F1, F2,); };
            }; }",
        );
        assert!(r
            .duplicate_files
            .iter()
            .all(|d| d.basis == DuplicateBasis::FileName));
        assert!(r.blocking().is_clean());
    }

    #[test]
    fn localizations_are_not_duplicates() {
        let r = report(
            "{ objects = {
                F1 = {isa = PBXFileReference; path = en.lproj/Main.strings; };
                F2 = {isa = PBXFileReference; path = fr.lproj/Main.strings; };
                V1 = {isa = PBXVariantGroup; children = (F1, F2,); name = Main.strings; };
            }; }",
        );
        assert!(r.duplicate_files.is_empty());
    }

    #[test]
    fn introduced_since_ignores_inherited_problems() {
        let baseline = Report {
            duplicate_memberships: vec![DuplicateMembership {
                holder: ObjectId::from("P1"),
                member: ObjectId::from("B1"),
                count: 3,
            }],
            duplicate_files: vec![DuplicateFiles {
                key: "A".into(),
                basis: DuplicateBasis::ResolvedPath,
                ids: vec![ObjectId::from("F1"), ObjectId::from("F2"), ObjectId::from("F3")],
            }],
            ..Report::default()
        };
        let shrunk = Report {
            duplicate_memberships: vec![DuplicateMembership {
                holder: ObjectId::from("P1"),
                member: ObjectId::from("B1"),
                count: 2,
            }],
            duplicate_files: vec![DuplicateFiles {
                key: "A".into(),
                basis: DuplicateBasis::ResolvedPath,
                ids: vec![ObjectId::from("F2"), ObjectId::from("F3")],
            }],
            ..Report::default()
        };
        assert!(shrunk.introduced_since(&baseline).is_clean());

        let grown = Report {
            dangling_references: vec![DanglingRef {
                holder: ObjectId::from("G1"),
                field: "children",
                target: ObjectId::from("X"),
            }],
            ..shrunk
        };
        assert_eq!(grown.introduced_since(&baseline).problem_count(), 1);
    }

    #[test]
    fn report_json_and_display() {
        let r = report(
            "{ objects = { G1 = {isa = PBXGroup; children = (GONE,); }; }; }",
        );
        let json = r.to_json().unwrap();
        assert!(json.contains("\"dangling_references\""));
        assert!(json.contains("\"GONE\""));
        assert!(r.to_string().contains("dangling: G1 children -> GONE"));
    }
}

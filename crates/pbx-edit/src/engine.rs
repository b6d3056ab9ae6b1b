//! Mutation engine
//!
//! Every operation runs against a [`Draft`]: a private clone of the tree
//! plus the model built from the tree before the call. Preconditions are
//! checked against that model before anything is touched; a failing call
//! simply drops its draft. Tree edits go through `sections` and the
//! layout-preserving methods of `pbx_plist`, so only the entries an
//! operation names change on disk.

use crate::error::{EditError, EditResult};
use crate::ids::IdAllocator;
use crate::policy::DedupePolicy;
use crate::sections::{insert_entry, list_mut, object_mut, remove_entry};
use pbx_model::{
    duplicate_files, file_name_of, infer_file_type, isa, normalize_path, DuplicateBasis,
    GroupPath, Model, ModelError, ObjectId, SourceTree,
};
use pbx_plist::{Document, Field, Object, Scalar, Value};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// What `remove_file` should match
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoveTarget {
    /// One FileReference by identifier
    Id(ObjectId),
    /// FileReferences whose `path` field or resolved path equals this
    Path(String),
    /// Every FileReference whose file name is this, wherever it lives
    FileName(String),
}

impl RemoveTarget {
    /// Target an identifier
    #[must_use]
    pub fn id(id: impl Into<ObjectId>) -> Self {
        Self::Id(id.into())
    }

    /// Target a path
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Target every copy of a file name
    #[must_use]
    pub fn file_name(name: impl Into<String>) -> Self {
        Self::FileName(name.into())
    }
}

impl Display for RemoveTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Path(path) => write!(f, "path {path}"),
            Self::FileName(name) => write!(f, "file name {name}"),
        }
    }
}

/// One file for `add_files`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRequest {
    /// Path relative to the group (or absolute with `<absolute>`)
    pub path: String,
    /// Destination group below the main group
    pub group: GroupPath,
    /// What `path` is relative to
    pub source_tree: SourceTree,
}

impl AddRequest {
    /// Group-relative request
    #[must_use]
    pub fn new(path: impl Into<String>, group: GroupPath) -> Self {
        Self {
            path: path.into(),
            group,
            source_tree: SourceTree::Group,
        }
    }

    /// With a different source tree
    #[must_use]
    pub fn with_source_tree(mut self, source_tree: SourceTree) -> Self {
        self.source_tree = source_tree;
        self
    }
}

/// Identifiers created by a successful `add_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Added {
    /// New FileReference
    pub file_ref: ObjectId,
    /// New BuildFile
    pub build_file: ObjectId,
}

/// What one duplicate set came to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupeGroup {
    /// Resolved path or file name shared by the set
    pub key: String,
    /// Which comparison grouped them
    pub basis: DuplicateBasis,
    /// Survivor
    pub kept: ObjectId,
    /// Cascade-removed copies
    pub removed: Vec<ObjectId>,
    /// Losers left alone because an uninterpreted field still uses them
    pub retained: Vec<ObjectId>,
}

/// Working copy for one operation
pub(crate) struct Draft<'s> {
    pub(crate) doc: Document,
    model: &'s Model,
    ids: &'s mut IdAllocator,
}

impl<'s> Draft<'s> {
    pub(crate) fn new(doc: Document, model: &'s Model, ids: &'s mut IdAllocator) -> Self {
        Self { doc, model, ids }
    }

    fn objects(&mut self) -> EditResult<&mut Object> {
        self.doc
            .root_mut()
            .as_object_mut()
            .and_then(|root| root.get_mut("objects"))
            .and_then(Value::as_object_mut)
            .ok_or(EditError::Model(ModelError::MissingObjects))
    }

    fn fresh_id(&mut self) -> ObjectId {
        let model = self.model;
        self.ids.allocate(|token| model.contains(token))
    }

    // --- add -----------------------------------------------------------

    pub(crate) fn add_file(
        &mut self,
        path: &str,
        source_tree: &SourceTree,
        group: &str,
        phase: &str,
    ) -> EditResult<Added> {
        let model = self.model;
        let path = checked_path(path)?;
        if model.group(group).is_none() {
            return Err(EditError::group_not_found(group));
        }
        let phase_entity = model
            .phase(phase)
            .ok_or_else(|| EditError::phase_not_found(phase))?;
        let target = model.resolve_new(path, source_tree, group);
        if let Some(existing) = model.files_at(&target).into_iter().next() {
            return Err(EditError::AlreadyExists {
                path: target.to_string(),
                existing,
            });
        }

        let name = file_name_of(path);
        let file_ref = self.fresh_id();
        let build_file = self.fresh_id();
        let membership = format!("{name} in {}", phase_entity.kind.label());

        let mut fields = vec![
            ("isa", Value::string(isa::FILE_REFERENCE)),
            ("lastKnownFileType", Value::string(infer_file_type(path))),
        ];
        if name != path {
            fields.push(("name", Value::string(name)));
        }
        fields.push(("path", Value::string(path)));
        fields.push(("sourceTree", Value::string(source_tree.as_str())));

        let objects = self.objects()?;
        insert_entry(
            objects,
            isa::BUILD_FILE,
            Field::new(
                Scalar::new(build_file.as_str()).with_note(&membership),
                Value::Object(Object::inline(vec![
                    ("isa", Value::string(isa::BUILD_FILE)),
                    ("fileRef", annotated(&file_ref, name)),
                ])),
            ),
        );
        insert_entry(
            objects,
            isa::FILE_REFERENCE,
            Field::new(
                Scalar::new(file_ref.as_str()).with_note(name),
                Value::Object(Object::inline(fields)),
            ),
        );
        list_mut(objects, group, "children")
            .ok_or_else(|| EditError::group_not_found(group))?
            .push(annotated(&file_ref, name));
        list_mut(objects, phase, "files")
            .ok_or_else(|| EditError::phase_not_found(phase))?
            .push(annotated(&build_file, &membership));

        tracing::info!(%file_ref, %build_file, path, group, phase, "added file");
        Ok(Added {
            file_ref,
            build_file,
        })
    }

    pub(crate) fn add_file_at(
        &mut self,
        request: &AddRequest,
        phase: &str,
    ) -> EditResult<Added> {
        let model = self.model;
        let group = model
            .group_by_path(&request.group)
            .ok_or_else(|| EditError::group_not_found(request.group.to_string()))?;
        self.add_file(&request.path, &request.source_tree, group.as_str(), phase)
    }

    // --- remove --------------------------------------------------------

    /// FileReferences a target denotes, in document order
    pub(crate) fn resolve_target(&self, target: &RemoveTarget) -> EditResult<Vec<ObjectId>> {
        let model = self.model;
        Ok(match target {
            RemoveTarget::Id(id) => {
                if model.file_ref(id).is_none() {
                    return Err(EditError::NotFound(id.to_string()));
                }
                vec![id.clone()]
            }
            RemoveTarget::Path(path) => {
                let wanted = normalize_path(path);
                model
                    .file_refs()
                    .filter(|f| {
                        normalize_path(&f.path) == wanted
                            || model
                                .resolved_path(&f.id)
                                .is_some_and(|p| p.to_string() == wanted)
                    })
                    .map(|f| f.id.clone())
                    .collect()
            }
            RemoveTarget::FileName(name) => model.files_named(name).to_vec(),
        })
    }

    pub(crate) fn remove_files(&mut self, targets: &[RemoveTarget]) -> EditResult<usize> {
        let mut doomed: Vec<ObjectId> = Vec::new();
        for target in targets {
            for id in self.resolve_target(target)? {
                if !doomed.contains(&id) {
                    doomed.push(id);
                }
            }
        }
        self.cascade_remove(&doomed)?;
        Ok(doomed.len())
    }

    /// Delete FileReferences with their BuildFiles and every membership
    fn cascade_remove(&mut self, files: &[ObjectId]) -> EditResult<()> {
        let model = self.model;
        for id in files {
            if let Some(user) = model.external_refs_to(id).first() {
                return Err(EditError::InUse {
                    id: id.clone(),
                    holder: user.holder.clone(),
                    field: user.field.clone(),
                });
            }
        }
        let objects = self.objects()?;
        for id in files {
            let build_files = model.build_files_for(id);
            for bf in build_files {
                for phase in model.phases_listing(bf) {
                    if let Some(list) = list_mut(objects, phase, "files") {
                        list.remove_where(|v| v.as_str() == Some(bf.as_str()));
                    }
                }
                remove_entry(objects, bf);
            }
            for group in model.parents_of(id) {
                if let Some(list) = list_mut(objects, group, "children") {
                    list.remove_where(|v| v.as_str() == Some(id.as_str()));
                }
            }
            remove_entry(objects, id);
            tracing::debug!(%id, build_files = build_files.len(), "removed file reference");
        }
        Ok(())
    }

    // --- dedupe --------------------------------------------------------

    pub(crate) fn dedupe(&mut self, policy: &dyn DedupePolicy) -> EditResult<Vec<DedupeGroup>> {
        let model = self.model;
        let mut sets = duplicate_files(model);
        // name sets contain the path sets; settle them first
        sets.sort_by_key(|d| d.basis != DuplicateBasis::FileName);

        let mut winners: Vec<ObjectId> = Vec::new();
        let mut losers: Vec<ObjectId> = Vec::new();
        let mut groups = Vec::new();
        for set in sets {
            let live: Vec<ObjectId> = set
                .ids
                .into_iter()
                .filter(|id| !losers.contains(id))
                .collect();
            if live.len() < 2 {
                continue;
            }
            let kept = live
                .iter()
                .find(|id| winners.contains(id))
                .cloned()
                .or_else(|| policy.choose(model, &live));
            let Some(kept) = kept else {
                continue;
            };
            let (removed, retained): (Vec<ObjectId>, Vec<ObjectId>) = live
                .into_iter()
                .filter(|id| *id != kept)
                .partition(|id| model.external_refs_to(id).is_empty());
            losers.extend(removed.iter().cloned());
            winners.push(kept.clone());
            groups.push(DedupeGroup {
                key: set.key,
                basis: set.basis,
                kept,
                removed,
                retained,
            });
        }
        self.cascade_remove(&losers)?;
        tracing::info!(
            policy = policy.name(),
            sets = groups.len(),
            removed = losers.len(),
            "deduplicated"
        );
        Ok(groups)
    }

    // --- retarget ------------------------------------------------------

    pub(crate) fn retarget(&mut self, id: &str, new_path: &str, new_group: &str) -> EditResult<()> {
        if self.model.group(new_group).is_none() {
            return Err(EditError::group_not_found(new_group));
        }
        self.relocate(id, new_path, Some(new_group))
    }

    pub(crate) fn rename_file(&mut self, id: &str, new_name: &str) -> EditResult<String> {
        let model = self.model;
        let fr = model
            .file_ref(id)
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;
        if new_name.is_empty() || new_name.contains('/') {
            return Err(EditError::InvalidPath {
                path: new_name.to_string(),
                reason: "a file name must be non-empty and contain no `/`",
            });
        }
        let new_path = match fr.path.trim_end_matches('/').rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{new_name}"),
            None => new_name.to_string(),
        };
        self.relocate(id, &new_path, None)?;
        Ok(new_path)
    }

    /// Change a file's path and, when `group` is given, its parent group
    fn relocate(&mut self, id: &str, new_path: &str, group: Option<&str>) -> EditResult<()> {
        let model = self.model;
        let fr = model
            .file_ref(id)
            .ok_or_else(|| EditError::NotFound(id.to_string()))?;
        let new_path = checked_path(new_path)?;
        let parents = model.parents_of(id);
        let anchor = group
            .or_else(|| parents.first().map(ObjectId::as_str))
            .unwrap_or_default();
        let target = model.resolve_new(new_path, &fr.source_tree, anchor);
        if let Some(other) = model.files_at(&target).into_iter().find(|o| o.as_str() != id) {
            return Err(EditError::AlreadyExists {
                path: target.to_string(),
                existing: other,
            });
        }

        let old_name = fr.file_name();
        let new_name = file_name_of(new_path);
        let objects = self.objects()?;
        let body = object_mut(objects, id).ok_or_else(|| EditError::NotFound(id.to_string()))?;
        body.set("path", Value::string(new_path));
        if fr.name.as_deref() == Some(old_name) {
            body.set("name", Value::string(new_name));
        }
        if old_name != new_name {
            rename_notes(objects, model, &fr.id, old_name, new_name);
        }

        if let Some(group) = group {
            for parent in parents.iter().filter(|p| p.as_str() != group) {
                if let Some(list) = list_mut(objects, parent, "children") {
                    list.remove_where(|v| v.as_str() == Some(id));
                }
            }
            if !parents.iter().any(|p| p.as_str() == group) {
                list_mut(objects, group, "children")
                    .ok_or_else(|| EditError::group_not_found(group))?
                    .push(annotated(&fr.id, new_name));
            }
        }
        tracing::info!(%id, from = %fr.path, to = new_path, group = anchor, "retargeted file");
        Ok(())
    }

    // --- repair --------------------------------------------------------

    /// Collapse repeated entries and competing BuildFiles in one phase
    pub(crate) fn normalize_phase(&mut self, phase: &str) -> EditResult<usize> {
        let model = self.model;
        let entity = model
            .phase(phase)
            .ok_or_else(|| EditError::phase_not_found(phase))?;

        let mut seen_entries: HashSet<&str> = HashSet::new();
        let mut seen_files: HashSet<&str> = HashSet::new();
        let mut dropped_wrappers: Vec<&ObjectId> = Vec::new();
        let mut drop_positions: Vec<usize> = Vec::new();
        for (pos, entry) in entity.files.iter().enumerate() {
            if !seen_entries.insert(entry.as_str()) {
                drop_positions.push(pos);
                continue;
            }
            let target = model.build_file(entry).and_then(|bf| bf.file_ref.as_ref());
            if let Some(target) = target {
                if !seen_files.insert(target.as_str()) {
                    drop_positions.push(pos);
                    dropped_wrappers.push(entry);
                }
            }
        }
        if drop_positions.is_empty() {
            return Ok(0);
        }

        let objects = self.objects()?;
        let list = list_mut(objects, phase, "files").ok_or_else(|| EditError::phase_not_found(phase))?;
        let mut pos = 0;
        let collapsed = list.remove_where(|_| {
            let drop = drop_positions.contains(&pos);
            pos += 1;
            drop
        });
        for wrapper in dropped_wrappers {
            let listed_elsewhere = model.phases_listing(wrapper).iter().any(|p| p != &entity.id);
            if !listed_elsewhere {
                remove_entry(objects, wrapper);
            }
        }
        tracing::info!(%phase, collapsed, "normalized phase");
        Ok(collapsed)
    }

    pub(crate) fn normalize_all_phases(&mut self) -> EditResult<usize> {
        let phases: Vec<ObjectId> = self.model.phases().map(|p| p.id.clone()).collect();
        let mut total = 0;
        for phase in phases {
            total += self.normalize_phase(phase.as_str())?;
        }
        Ok(total)
    }

    /// Drop list entries and BuildFiles that point at missing objects
    pub(crate) fn prune_dangling(&mut self) -> EditResult<usize> {
        let model = self.model;
        let dead: Vec<&ObjectId> = model
            .build_files()
            .filter(|bf| {
                [&bf.file_ref, &bf.product_ref]
                    .into_iter()
                    .flatten()
                    .any(|target| !model.contains(target))
            })
            .map(|bf| &bf.id)
            .collect();

        let objects = self.objects()?;
        let mut removed = 0;
        for group in model.groups() {
            if let Some(list) = list_mut(objects, &group.id, "children") {
                removed += list.remove_where(|v| v.as_str().is_some_and(|s| !model.contains(s)));
            }
        }
        for phase in model.phases() {
            if let Some(list) = list_mut(objects, &phase.id, "files") {
                removed += list.remove_where(|v| {
                    v.as_str().is_some_and(|s| {
                        model.isa_of(s) != Some(isa::BUILD_FILE) || dead.iter().any(|d| d.as_str() == s)
                    })
                });
            }
        }
        for bf in dead {
            if remove_entry(objects, bf).is_some() {
                removed += 1;
            }
        }
        tracing::info!(removed, "pruned dangling references");
        Ok(removed)
    }
}

fn checked_path(path: &str) -> EditResult<&str> {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Err(EditError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty",
        });
    }
    Ok(trimmed)
}

fn annotated(id: &ObjectId, note: &str) -> Value {
    Value::Scalar(Scalar::new(id.as_str()).with_note(note))
}

/// Swap `old` for `new` in an annotation
fn renote(scalar: &mut Scalar, old: &str, new: &str) {
    if let Some(note) = scalar.note() {
        if note.contains(old) {
            let updated = note.replacen(old, new, 1);
            scalar.set_note(Some(&updated));
        }
    }
}

/// Refresh the human-readable annotations that mention a renamed file
fn rename_notes(objects: &mut Object, model: &Model, id: &ObjectId, old: &str, new: &str) {
    let wrappers = model.build_files_for(id);
    let is_wrapper = |key: &str| wrappers.iter().any(|w| w.as_str() == key);
    let holders: Vec<&ObjectId> = model
        .parents_of(id)
        .iter()
        .chain(wrappers.iter().flat_map(|w| model.phases_listing(w)))
        .collect();

    for field in objects.fields_mut() {
        let key = field.key().value().to_string();
        if key == id.as_str() || is_wrapper(&key) {
            renote(field.key_mut(), old, new);
        }
        let Some(body) = field.value_mut().as_object_mut() else {
            continue;
        };
        if is_wrapper(&key) {
            if let Some(Value::Scalar(target)) = body.get_mut("fileRef") {
                renote(target, old, new);
            }
        }
        if holders.iter().any(|h| h.as_str() == key) {
            for list_key in ["children", "files"] {
                let Some(list) = body.get_mut(list_key).and_then(Value::as_list_mut) else {
                    continue;
                };
                for value in list.values_mut() {
                    if let Value::Scalar(entry) = value {
                        if entry.value() == id.as_str() || is_wrapper(entry.value()) {
                            renote(entry, old, new);
                        }
                    }
                }
            }
        }
    }
}

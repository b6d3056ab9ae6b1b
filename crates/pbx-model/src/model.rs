//! Entity model over a parsed document
//!
//! [`Model::build`] walks the `objects` table once, interprets the four
//! entity kinds and builds the lookup indexes. The model owns plain copies
//! of interpreted fields only; it is rebuilt after every edit rather than
//! patched, so it can never drift from the tree.

use crate::entity::{
    isa, BuildFile, BuildPhase, Entity, FileReference, Group, GroupKind, PhaseKind,
    SourceTree,
};
use crate::error::{ModelError, SchemaError};
use crate::group_path::GroupPath;
use crate::id::ObjectId;
use indexmap::IndexMap;
use pbx_plist::{Document, Object, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Guard against group cycles in corrupted input
const MAX_GROUP_DEPTH: usize = 256;

/// Every object in the table, modeled or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// `isa`, if the object has one
    pub isa: Option<String>,
    /// Position in the `objects` table
    pub order: usize,
}

/// A reference to a FileReference from a field the model does not interpret
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalRef {
    /// Object holding the reference
    pub holder: ObjectId,
    /// Field name it sits under
    pub field: String,
}

/// Where a file or group lives, with `<group>` chains resolved away
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResolvedPath {
    /// Anchor; never [`SourceTree::Group`]
    pub root: SourceTree,
    /// Normalized path below the anchor
    pub path: String,
}

impl ResolvedPath {
    /// The project directory
    #[must_use]
    pub fn project_root() -> Self {
        Self {
            root: SourceTree::SourceRoot,
            path: String::new(),
        }
    }

    /// Anchor a path at `root`
    #[must_use]
    pub fn new(root: SourceTree, path: &str) -> Self {
        Self {
            root,
            path: normalize_path(path),
        }
    }

    /// Append a relative path
    #[must_use]
    pub fn join(&self, relative: &str) -> Self {
        let joined = if self.path.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.path, relative)
        };
        Self {
            root: self.root.clone(),
            path: normalize_path(&joined),
        }
    }
}

impl Display for ResolvedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.root {
            SourceTree::SourceRoot | SourceTree::Group if self.path.is_empty() => f.write_str("."),
            SourceTree::SourceRoot | SourceTree::Group | SourceTree::Absolute => {
                f.write_str(&self.path)
            }
            other => write!(f, "$({})/{}", other.as_str(), self.path),
        }
    }
}

/// Collapse `.`, `..` and empty segments; keeps a leading `/`
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if path.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Typed, indexed view of one document
#[derive(Debug, Clone, Default)]
pub struct Model {
    objects: IndexMap<ObjectId, ObjectInfo>,
    file_refs: IndexMap<ObjectId, FileReference>,
    build_files: IndexMap<ObjectId, BuildFile>,
    groups: IndexMap<ObjectId, Group>,
    phases: IndexMap<ObjectId, BuildPhase>,
    by_file_name: HashMap<String, Vec<ObjectId>>,
    parents: HashMap<ObjectId, Vec<ObjectId>>,
    build_files_by_ref: HashMap<ObjectId, Vec<ObjectId>>,
    phases_by_build_file: HashMap<ObjectId, Vec<ObjectId>>,
    external_refs: HashMap<ObjectId, Vec<ExternalRef>>,
    main_group: Option<ObjectId>,
    schema_errors: Vec<SchemaError>,
}

impl Model {
    /// Interpret a document
    ///
    /// Malformed entities are skipped and listed in [`Model::schema_errors`].
    ///
    /// # Errors
    /// - `ModelError::RootNotObject` if the root is not `{ ... }`
    /// - `ModelError::MissingObjects` if there is no `objects` table
    pub fn build(doc: &Document) -> Result<Self, ModelError> {
        let root = doc
            .root()
            .as_object()
            .ok_or(ModelError::RootNotObject(doc.root().kind()))?;
        let objects = objects_table(root).ok_or(ModelError::MissingObjects)?;

        let mut model = Self::default();
        for (order, field) in objects.fields().iter().enumerate() {
            let id = ObjectId::from(field.key().value());
            if model.objects.contains_key(&id) {
                model.schema_errors.push(SchemaError::new(
                    &id,
                    "?",
                    format!("identifier repeated at position {order}"),
                ));
                continue;
            }
            let Some(obj) = field.value().as_object() else {
                model.objects.insert(id.clone(), ObjectInfo { isa: None, order });
                model.schema_errors.push(SchemaError::new(
                    &id,
                    "?",
                    format!("entry is a {}, expected an object", field.value().kind()),
                ));
                continue;
            };
            let isa = obj.get_str("isa").map(str::to_string);
            model.objects.insert(
                id.clone(),
                ObjectInfo {
                    isa: isa.clone(),
                    order,
                },
            );
            if let Some(isa) = isa {
                if let Err(err) = model.interpret(&id, &isa, field.key().note(), obj) {
                    tracing::warn!(%err, "skipping malformed entity");
                    model.schema_errors.push(err);
                }
            }
        }

        model.main_group = root
            .get_str("rootObject")
            .and_then(|project| objects.get(project))
            .and_then(Value::as_object)
            .filter(|p| p.get_str("isa") == Some(isa::PROJECT))
            .and_then(|p| p.get_str("mainGroup"))
            .map(ObjectId::from)
            .filter(|g| model.groups.contains_key(g));

        model.index();
        model.scan_external_refs(objects);
        tracing::debug!(
            objects = model.objects.len(),
            file_refs = model.file_refs.len(),
            groups = model.groups.len(),
            phases = model.phases.len(),
            schema_errors = model.schema_errors.len(),
            "model built"
        );
        Ok(model)
    }

    /// Like [`Model::build`] but fails on the first schema error
    ///
    /// # Errors
    /// Any [`ModelError`], including `ModelError::Schema`.
    pub fn build_strict(doc: &Document) -> Result<Self, ModelError> {
        let model = Self::build(doc)?;
        match model.schema_errors.first() {
            Some(err) => Err(err.clone().into()),
            None => Ok(model),
        }
    }

    fn interpret(
        &mut self,
        id: &ObjectId,
        isa_name: &str,
        note: Option<&str>,
        obj: &Object,
    ) -> Result<(), SchemaError> {
        match isa_name {
            isa::FILE_REFERENCE => {
                let path = required_str(id, isa_name, obj, "path")?;
                let file_type = obj
                    .get_str("lastKnownFileType")
                    .or_else(|| obj.get_str("explicitFileType"))
                    .map(str::to_string);
                self.file_refs.insert(
                    id.clone(),
                    FileReference {
                        id: id.clone(),
                        display_name: note.map(str::to_string),
                        name: obj.get_str("name").map(str::to_string),
                        path: path.to_string(),
                        source_tree: source_tree_of(obj),
                        file_type,
                    },
                );
            }
            isa::BUILD_FILE => {
                let file_ref = optional_str(id, isa_name, obj, "fileRef")?;
                let product_ref = optional_str(id, isa_name, obj, "productRef")?;
                if file_ref.is_none() && product_ref.is_none() {
                    return Err(SchemaError::new(id, isa_name, "missing `fileRef`"));
                }
                self.build_files.insert(
                    id.clone(),
                    BuildFile {
                        id: id.clone(),
                        file_ref: file_ref.map(ObjectId::from),
                        product_ref: product_ref.map(ObjectId::from),
                    },
                );
            }
            isa::GROUP | isa::VARIANT_GROUP => {
                let children = id_list(id, isa_name, obj, "children")?;
                let kind = if isa_name == isa::GROUP {
                    GroupKind::Plain
                } else {
                    GroupKind::Variant
                };
                self.groups.insert(
                    id.clone(),
                    Group {
                        id: id.clone(),
                        kind,
                        children,
                        path: optional_str(id, isa_name, obj, "path")?.map(str::to_string),
                        name: optional_str(id, isa_name, obj, "name")?.map(str::to_string),
                        source_tree: source_tree_of(obj),
                    },
                );
            }
            other => {
                if let Some(kind) = PhaseKind::from_isa(other) {
                    let files = id_list(id, isa_name, obj, "files")?;
                    self.phases.insert(
                        id.clone(),
                        BuildPhase {
                            id: id.clone(),
                            kind,
                            files,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn index(&mut self) {
        for (id, fr) in &self.file_refs {
            self.by_file_name
                .entry(fr.file_name().to_string())
                .or_default()
                .push(id.clone());
        }
        for group in self.groups.values() {
            for child in &group.children {
                let parents = self.parents.entry(child.clone()).or_default();
                if !parents.contains(&group.id) {
                    parents.push(group.id.clone());
                }
            }
        }
        for bf in self.build_files.values() {
            if let Some(target) = &bf.file_ref {
                self.build_files_by_ref
                    .entry(target.clone())
                    .or_default()
                    .push(bf.id.clone());
            }
        }
        for phase in self.phases.values() {
            for file in &phase.files {
                let phases = self.phases_by_build_file.entry(file.clone()).or_default();
                if !phases.contains(&phase.id) {
                    phases.push(phase.id.clone());
                }
            }
        }
    }

    /// Record FileReference ids mentioned outside the modeled fields
    fn scan_external_refs(&mut self, objects: &Object) {
        for field in objects.fields() {
            let holder = ObjectId::from(field.key().value());
            let Some(obj) = field.value().as_object() else {
                continue;
            };
            let isa_name = obj.get_str("isa").unwrap_or_default();
            if isa_name == isa::FILE_REFERENCE {
                continue;
            }
            let modeled: &[&str] = match isa_name {
                isa::BUILD_FILE => &["isa", "fileRef"],
                isa::GROUP | isa::VARIANT_GROUP => &["isa", "children"],
                _ if self.phases.contains_key(&holder) => &["isa", "files"],
                _ => &["isa"],
            };
            for entry in obj.fields() {
                let name = entry.key().value();
                if modeled.contains(&name) {
                    continue;
                }
                let mut hits = Vec::new();
                collect_scalars(entry.value(), &mut hits);
                for hit in hits {
                    if self.file_refs.contains_key(hit) {
                        self.external_refs
                            .entry(ObjectId::from(hit))
                            .or_default()
                            .push(ExternalRef {
                                holder: holder.clone(),
                                field: name.to_string(),
                            });
                    }
                }
            }
        }
    }

    // --- lookups -------------------------------------------------------

    /// Whether any object (modeled or not) has this identifier
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    /// All identifiers in document order
    pub fn ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }

    /// Number of objects in the table
    #[inline]
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// `isa` of any object
    #[must_use]
    pub fn isa_of(&self, id: &str) -> Option<&str> {
        self.objects.get(id).and_then(|o| o.isa.as_deref())
    }

    /// Position in the `objects` table
    #[must_use]
    pub fn order_of(&self, id: &str) -> Option<usize> {
        self.objects.get(id).map(|o| o.order)
    }

    /// Typed view of a modeled entity
    #[must_use]
    pub fn entity(&self, id: &str) -> Option<Entity<'_>> {
        if let Some(e) = self.file_refs.get(id) {
            return Some(Entity::FileReference(e));
        }
        if let Some(e) = self.build_files.get(id) {
            return Some(Entity::BuildFile(e));
        }
        if let Some(e) = self.groups.get(id) {
            return Some(Entity::Group(e));
        }
        self.phases.get(id).map(Entity::BuildPhase)
    }

    /// FileReference by id
    #[must_use]
    pub fn file_ref(&self, id: &str) -> Option<&FileReference> {
        self.file_refs.get(id)
    }

    /// BuildFile by id
    #[must_use]
    pub fn build_file(&self, id: &str) -> Option<&BuildFile> {
        self.build_files.get(id)
    }

    /// Group by id
    #[must_use]
    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    /// BuildPhase by id
    #[must_use]
    pub fn phase(&self, id: &str) -> Option<&BuildPhase> {
        self.phases.get(id)
    }

    /// FileReferences in document order
    pub fn file_refs(&self) -> impl Iterator<Item = &FileReference> {
        self.file_refs.values()
    }

    /// BuildFiles in document order
    pub fn build_files(&self) -> impl Iterator<Item = &BuildFile> {
        self.build_files.values()
    }

    /// Groups in document order
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Build phases in document order
    pub fn phases(&self) -> impl Iterator<Item = &BuildPhase> {
        self.phases.values()
    }

    /// FileReferences whose path ends in `name`, in document order
    #[must_use]
    pub fn files_named(&self, name: &str) -> &[ObjectId] {
        self.by_file_name.get(name).map_or(&[], Vec::as_slice)
    }

    /// Distinct file names with every FileReference carrying them
    pub fn file_names(&self) -> impl Iterator<Item = (&str, &[ObjectId])> {
        self.by_file_name
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Members of a Group or BuildPhase
    #[must_use]
    pub fn children_of(&self, id: &str) -> Option<&[ObjectId]> {
        self.groups
            .get(id)
            .map(|g| g.children.as_slice())
            .or_else(|| self.phases.get(id).map(|p| p.files.as_slice()))
    }

    /// Groups listing `id` as a child
    #[must_use]
    pub fn parents_of(&self, id: &str) -> &[ObjectId] {
        self.parents.get(id).map_or(&[], Vec::as_slice)
    }

    /// BuildFiles whose `fileRef` is `id`
    #[must_use]
    pub fn build_files_for(&self, id: &str) -> &[ObjectId] {
        self.build_files_by_ref.get(id).map_or(&[], Vec::as_slice)
    }

    /// Phases listing a BuildFile
    #[must_use]
    pub fn phases_listing(&self, build_file: &str) -> &[ObjectId] {
        self.phases_by_build_file
            .get(build_file)
            .map_or(&[], Vec::as_slice)
    }

    /// Uninterpreted fields pointing at a FileReference
    #[must_use]
    pub fn external_refs_to(&self, id: &str) -> &[ExternalRef] {
        self.external_refs.get(id).map_or(&[], Vec::as_slice)
    }

    /// The project's main group, if the root object names one
    #[must_use]
    pub fn main_group(&self) -> Option<&ObjectId> {
        self.main_group.as_ref()
    }

    /// Entities skipped during build
    #[must_use]
    pub fn schema_errors(&self) -> &[SchemaError] {
        &self.schema_errors
    }

    // --- paths ---------------------------------------------------------

    /// Resolve a FileReference to its anchored location
    #[must_use]
    pub fn resolved_path(&self, file_ref: &str) -> Option<ResolvedPath> {
        let fr = self.file_refs.get(file_ref)?;
        let parent = self.parents_of(file_ref).first();
        Some(self.locate(&fr.source_tree, &fr.path, parent, 0))
    }

    /// Resolve a prospective file placed under `group`
    #[must_use]
    pub fn resolve_new(&self, path: &str, source_tree: &SourceTree, group: &str) -> ResolvedPath {
        let group = self.groups.get(group).map(|g| &g.id);
        self.locate(source_tree, path, group, 0)
    }

    /// Location of a group's folder
    #[must_use]
    pub fn group_location(&self, group: &str) -> ResolvedPath {
        self.group_location_at(group, 0)
    }

    fn group_location_at(&self, id: &str, depth: usize) -> ResolvedPath {
        let Some(group) = self.groups.get(id) else {
            return ResolvedPath::project_root();
        };
        let parent = self.parents_of(id).first();
        self.locate(
            &group.source_tree,
            group.path.as_deref().unwrap_or(""),
            parent,
            depth,
        )
    }

    fn locate(
        &self,
        source_tree: &SourceTree,
        path: &str,
        parent: Option<&ObjectId>,
        depth: usize,
    ) -> ResolvedPath {
        match source_tree {
            SourceTree::Group => {
                let base = match parent {
                    Some(group) if depth < MAX_GROUP_DEPTH => {
                        self.group_location_at(group, depth + 1)
                    }
                    _ => ResolvedPath::project_root(),
                };
                base.join(path)
            }
            other => ResolvedPath::new(other.clone(), path),
        }
    }

    /// FileReferences resolving to `target`, in document order
    #[must_use]
    pub fn files_at(&self, target: &ResolvedPath) -> Vec<ObjectId> {
        self.file_refs
            .keys()
            .filter(|id| self.resolved_path(id).as_ref() == Some(target))
            .cloned()
            .collect()
    }

    /// Resolved location of every FileReference, in document order
    ///
    /// Project-relative paths are bare, absolute ones start with `/`, other
    /// anchors render as `$(ROOT)/path`.
    #[must_use]
    pub fn list_all_file_paths(&self) -> Vec<String> {
        self.file_refs
            .keys()
            .filter_map(|id| self.resolved_path(id))
            .map(|p| p.to_string())
            .collect()
    }

    /// Groups not listed as anyone's child
    pub fn root_groups(&self) -> impl Iterator<Item = &Group> {
        self.groups
            .values()
            .filter(|g| self.parents_of(&g.id).is_empty())
    }

    /// Find a group by display-name chain below the main group
    ///
    /// Without a main group, the first segment is matched against the
    /// parentless groups.
    #[must_use]
    pub fn group_by_path(&self, path: &GroupPath) -> Option<&ObjectId> {
        let mut segments = path.segments().iter();
        let mut current = match &self.main_group {
            Some(main) => main,
            None => {
                let first = segments.next()?;
                &self
                    .root_groups()
                    .find(|g| g.display_name() == Some(first.as_str()))?
                    .id
            }
        };
        for seg in segments {
            let group = self.groups.get(current)?;
            current = group
                .children
                .iter()
                .filter_map(|c| self.groups.get(c))
                .find(|g| g.display_name() == Some(seg.as_str()))
                .map(|g| &g.id)?;
        }
        Some(current)
    }

    /// Display-name chain from the main group down to `group`
    #[must_use]
    pub fn group_path_of(&self, group: &str) -> Option<GroupPath> {
        let mut segments = Vec::new();
        let mut current = self.groups.get(group)?;
        for _ in 0..MAX_GROUP_DEPTH {
            if self.main_group.as_ref() == Some(&current.id) {
                segments.reverse();
                return Some(GroupPath::new(segments));
            }
            segments.push(current.display_name().unwrap_or_default().to_string());
            match self.parents_of(&current.id).first() {
                Some(parent) => current = self.groups.get(parent)?,
                None if self.main_group.is_none() => {
                    segments.reverse();
                    return Some(GroupPath::new(segments));
                }
                None => return None,
            }
        }
        None
    }
}

/// The `objects` table of a root object
#[must_use]
pub fn objects_table(root: &Object) -> Option<&Object> {
    root.get("objects").and_then(Value::as_object)
}

fn source_tree_of(obj: &Object) -> SourceTree {
    obj.get_str("sourceTree").map(SourceTree::parse).unwrap_or_default()
}

fn required_str<'a>(
    id: &ObjectId,
    isa_name: &str,
    obj: &'a Object,
    key: &str,
) -> Result<&'a str, SchemaError> {
    optional_str(id, isa_name, obj, key)?
        .ok_or_else(|| SchemaError::new(id, isa_name, format!("missing `{key}`")))
}

fn optional_str<'a>(
    id: &ObjectId,
    isa_name: &str,
    obj: &'a Object,
    key: &str,
) -> Result<Option<&'a str>, SchemaError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::Scalar(s)) => Ok(Some(s.value())),
        Some(other) => Err(SchemaError::new(
            id,
            isa_name,
            format!("`{key}` is a {}, expected a string", other.kind()),
        )),
    }
}

fn id_list(
    id: &ObjectId,
    isa_name: &str,
    obj: &Object,
    key: &str,
) -> Result<Vec<ObjectId>, SchemaError> {
    let list = match obj.get(key) {
        Some(Value::List(list)) => list,
        Some(other) => {
            return Err(SchemaError::new(
                id,
                isa_name,
                format!("`{key}` is a {}, expected a list", other.kind()),
            ))
        }
        None => return Err(SchemaError::new(id, isa_name, format!("missing `{key}`"))),
    };
    list.values()
        .map(|v| {
            v.as_str().map(ObjectId::from).ok_or_else(|| {
                SchemaError::new(id, isa_name, format!("`{key}` holds a {}", v.kind()))
            })
        })
        .collect()
}

fn collect_scalars<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Scalar(s) => out.push(s.value()),
        Value::List(l) => l.values().for_each(|v| collect_scalars(v, out)),
        Value::Object(o) => o.fields().iter().for_each(|f| collect_scalars(f.value(), out)),
    }
}

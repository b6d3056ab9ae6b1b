//! Open / mutate / commit lifecycle
//!
//! A [`Session`] exclusively owns one parsed document, its model and the
//! integrity report taken when it was opened. Each mutation runs on a
//! draft; the draft replaces the document only if the re-checked graph has
//! no problems the baseline did not already have. An integrity violation
//! discards the draft and poisons the session, so a broken graph can never
//! reach [`Session::commit`].

use crate::config::EditConfig;
use crate::engine::{AddRequest, Added, DedupeGroup, Draft, RemoveTarget};
use crate::error::{EditError, EditResult, OpenError, WriteError};
use crate::ids::IdAllocator;
use crate::policy::DedupePolicy;
use pbx_model::{check, GroupPath, Model, ObjectId, Report, SourceTree};
use pbx_plist::{parse, serialize, ContentHash, Document};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result of [`Session::add_files`]
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Requests that created entries
    pub added: Vec<(AddRequest, Added)>,
    /// Requests already satisfied, with the FileReference found
    pub skipped: Vec<(AddRequest, ObjectId)>,
    /// Requests that failed
    pub failed: Vec<(AddRequest, EditError)>,
}

impl BatchOutcome {
    /// Every request was added or skipped
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of a session's state, for logs and callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Backing file, if any
    pub path: Option<PathBuf>,
    /// Uncommitted edits exist
    pub dirty: bool,
    /// An integrity violation ended the session
    pub poisoned: bool,
    /// Problems inherited from the opened document
    pub baseline_problems: usize,
    /// Identifiers allocated so far
    pub issued_ids: usize,
}

/// One open document
#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    config: EditConfig,
    opened_hash: Option<ContentHash>,
    doc: Document,
    model: Model,
    baseline: Report,
    ids: IdAllocator,
    dirty: bool,
    poisoned: bool,
}

impl Session {
    /// Read, parse and model a manifest file
    ///
    /// # Errors
    /// - `OpenError::Config` for an out-of-range configuration
    /// - `OpenError::Io` / `OpenError::TooLarge` for unreadable files
    /// - `OpenError::Syntax` / `OpenError::Model` for unusable text
    pub fn open(path: impl AsRef<Path>, config: EditConfig) -> Result<Self, OpenError> {
        let path = path.as_ref();
        config.validate().map_err(OpenError::Config)?;
        let size = fs::metadata(path)
            .map_err(|e| OpenError::io_error(path, e))?
            .len();
        if size > config.max_file_size {
            return Err(OpenError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: config.max_file_size,
            });
        }
        let bytes = fs::read(path).map_err(|e| OpenError::io_error(path, e))?;
        let hash = ContentHash::compute(&bytes);
        let text = String::from_utf8(bytes).map_err(|e| {
            OpenError::io_error(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        let mut session = Self::from_text(&text, config)?;
        session.path = Some(path.to_path_buf());
        session.opened_hash = Some(hash);
        tracing::info!(path = %path.display(), checksum = %hash.short(), "opened manifest");
        Ok(session)
    }

    /// Start a session over in-memory text
    ///
    /// # Errors
    /// As [`Session::open`], minus the IO cases.
    pub fn from_text(text: &str, config: EditConfig) -> Result<Self, OpenError> {
        config.validate().map_err(OpenError::Config)?;
        let doc = parse(text)?;
        let model = Model::build(&doc)?;
        let baseline = check(&model);
        if !baseline.is_clean() {
            tracing::warn!(problems = baseline.problem_count(), "document has integrity problems");
        }
        let ids = IdAllocator::new(config.id_width, config.seed);
        Ok(Self {
            path: None,
            config,
            opened_hash: None,
            doc,
            model,
            baseline,
            ids,
            dirty: false,
            poisoned: false,
        })
    }

    // --- accessors -----------------------------------------------------

    /// Current tree
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Current model
    #[inline]
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Report taken at open
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> &Report {
        &self.baseline
    }

    /// Fresh report for the current tree
    #[must_use]
    pub fn check(&self) -> Report {
        check(&self.model)
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Uncommitted edits exist
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// An integrity violation ended the session
    #[inline]
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Snapshot of the session state
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            path: self.path.clone(),
            dirty: self.dirty,
            poisoned: self.poisoned,
            baseline_problems: self.baseline.problem_count(),
            issued_ids: self.ids.issued(),
        }
    }

    /// Current text
    #[must_use]
    pub fn text(&self) -> String {
        serialize(&self.doc)
    }

    /// Resolved location of every FileReference, in document order
    #[must_use]
    pub fn list_all_file_paths(&self) -> Vec<String> {
        self.model.list_all_file_paths()
    }

    // --- transactions --------------------------------------------------

    fn transact<T>(
        &mut self,
        op: &'static str,
        edit: impl FnOnce(&mut Draft<'_>) -> EditResult<T>,
    ) -> EditResult<T> {
        if self.poisoned {
            return Err(EditError::Poisoned);
        }
        let mut draft = Draft::new(self.doc.clone(), &self.model, &mut self.ids);
        let value = match edit(&mut draft) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(op, %err, "edit rejected");
                return Err(err);
            }
        };
        let doc = draft.doc;
        let model = Model::build(&doc)?;
        let report = check(&model);
        let introduced = if self.config.baseline_relative {
            report.introduced_since(&self.baseline)
        } else {
            report.blocking()
        };
        if !introduced.is_clean() {
            self.poisoned = true;
            tracing::warn!(op, problems = introduced.problem_count(), "integrity violation, draft discarded");
            return Err(EditError::IntegrityViolation(introduced));
        }
        self.doc = doc;
        self.model = model;
        self.dirty = true;
        Ok(value)
    }

    // --- operations ----------------------------------------------------

    /// Create a FileReference under `group` and a BuildFile in `phase`
    ///
    /// # Errors
    /// `AlreadyExists` when an existing FileReference resolves to the same
    /// location; `TargetNotFound` for an unknown group or phase.
    pub fn add_file(
        &mut self,
        path: &str,
        source_tree: &SourceTree,
        group: &str,
        phase: &str,
    ) -> EditResult<Added> {
        self.transact("add_file", |d| d.add_file(path, source_tree, group, phase))
    }

    /// Add many files, each in its own transaction
    ///
    /// `AlreadyExists` counts as a skip. A failure is recorded and the batch
    /// continues; after an integrity violation the rest fail as `Poisoned`.
    pub fn add_files(&mut self, requests: &[AddRequest], phase: &str) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for request in requests {
            match self.transact("add_file", |d| d.add_file_at(request, phase)) {
                Ok(added) => outcome.added.push((request.clone(), added)),
                Err(EditError::AlreadyExists { existing, .. }) => {
                    outcome.skipped.push((request.clone(), existing));
                }
                Err(err) => {
                    tracing::warn!(path = %request.path, group = %request.group, %err, "add failed");
                    outcome.failed.push((request.clone(), err));
                }
            }
        }
        tracing::info!(
            added = outcome.added.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            "batch add finished"
        );
        outcome
    }

    /// Remove every FileReference the target denotes, with full cascade
    ///
    /// Path and file-name targets matching nothing remove nothing.
    ///
    /// # Errors
    /// `NotFound` for an unknown identifier; `InUse` when an uninterpreted
    /// field still references a matched file.
    pub fn remove_file(&mut self, target: &RemoveTarget) -> EditResult<usize> {
        self.remove_files(std::slice::from_ref(target))
    }

    /// Remove several targets in one transaction
    ///
    /// # Errors
    /// As [`Session::remove_file`]; nothing is removed if any target fails.
    pub fn remove_files(&mut self, targets: &[RemoveTarget]) -> EditResult<usize> {
        let removed = self.transact("remove_files", |d| d.remove_files(targets))?;
        tracing::info!(removed, targets = targets.len(), "removed files");
        Ok(removed)
    }

    /// Collapse duplicate FileReferences, keeping the one `policy` picks
    ///
    /// # Errors
    /// Only integrity failures; an already clean document yields no groups.
    pub fn dedupe(&mut self, policy: &dyn DedupePolicy) -> EditResult<Vec<DedupeGroup>> {
        self.transact("dedupe", |d| d.dedupe(policy))
    }

    /// [`Session::dedupe`] with the configured policy
    ///
    /// # Errors
    /// As [`Session::dedupe`].
    pub fn dedupe_default(&mut self) -> EditResult<Vec<DedupeGroup>> {
        let policy = self.config.dedupe_policy.policy();
        self.dedupe(policy)
    }

    /// Point a FileReference at a new path and move it to `new_group`
    ///
    /// # Errors
    /// `NotFound` for an unknown file, `TargetNotFound` for an unknown
    /// group, `AlreadyExists` if another file already lives there.
    pub fn retarget(&mut self, file_ref: &str, new_path: &str, new_group: &str) -> EditResult<()> {
        self.transact("retarget", |d| d.retarget(file_ref, new_path, new_group))
    }

    /// Change only the last component of a file's path; returns the new path
    ///
    /// # Errors
    /// `NotFound`, `InvalidPath` or `AlreadyExists`.
    pub fn rename_file(&mut self, file_ref: &str, new_name: &str) -> EditResult<String> {
        self.transact("rename_file", |d| d.rename_file(file_ref, new_name))
    }

    /// Remove repeated entries from one phase; returns how many went
    ///
    /// # Errors
    /// `TargetNotFound` for an unknown phase.
    pub fn normalize_phase(&mut self, phase: &str) -> EditResult<usize> {
        self.transact("normalize_phase", |d| d.normalize_phase(phase))
    }

    /// [`Session::normalize_phase`] over every phase
    ///
    /// # Errors
    /// Only integrity failures.
    pub fn normalize_all_phases(&mut self) -> EditResult<usize> {
        self.transact("normalize_all_phases", |d| d.normalize_all_phases())
    }

    /// Drop references to missing objects; returns how many went
    ///
    /// # Errors
    /// Only integrity failures.
    pub fn prune_dangling(&mut self) -> EditResult<usize> {
        self.transact("prune_dangling", |d| d.prune_dangling())
    }

    /// Resolve a group path to its identifier
    #[must_use]
    pub fn group_by_path(&self, path: &GroupPath) -> Option<&ObjectId> {
        self.model.group_by_path(path)
    }

    // --- commit --------------------------------------------------------

    /// Write the document back to the file it was opened from
    ///
    /// # Errors
    /// - `WriteError::Poisoned` after an integrity violation
    /// - `WriteError::NoPath` for sessions made from text
    /// - `WriteError::Stale` if the file changed since open
    /// - `WriteError::Io`; the original file is left as it was
    pub fn commit(&mut self) -> Result<ContentHash, WriteError> {
        if self.poisoned {
            return Err(WriteError::Poisoned);
        }
        let path = self.path.clone().ok_or(WriteError::NoPath)?;
        if self.config.check_stale {
            if let Some(expected) = self.opened_hash {
                let current = fs::read(&path).map_err(|e| WriteError::io_error(&path, e))?;
                let actual = ContentHash::compute(&current);
                if actual != expected {
                    tracing::warn!(path = %path.display(), "manifest changed on disk, refusing to commit");
                    return Err(WriteError::Stale {
                        path,
                        expected,
                        actual,
                    });
                }
            }
        }
        let hash = self.write_to(&path)?;
        self.opened_hash = Some(hash);
        self.dirty = false;
        Ok(hash)
    }

    /// Write the document to another file
    ///
    /// # Errors
    /// `WriteError::Poisoned` or `WriteError::Io`.
    pub fn commit_to(&self, path: impl AsRef<Path>) -> Result<ContentHash, WriteError> {
        if self.poisoned {
            return Err(WriteError::Poisoned);
        }
        self.write_to(path.as_ref())
    }

    fn write_to(&self, path: &Path) -> Result<ContentHash, WriteError> {
        let text = serialize(&self.doc);
        write_atomic(path, text.as_bytes())?;
        let hash = ContentHash::compute(text.as_bytes());
        tracing::info!(path = %path.display(), checksum = %hash.short(), bytes = text.len(), "committed manifest");
        Ok(hash)
    }
}

/// Replace `path` through a temp file in the same directory
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let io = |e: std::io::Error| WriteError::io_error(path, e);
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io)?;
    tmp.write_all(bytes).map_err(io)?;
    tmp.as_file().sync_all().map_err(io)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(io)?;
    }
    tmp.persist(path).map_err(|e| io(e.error))?;
    Ok(())
}

//! Scoped backup of a manifest file
//!
//! [`BackupGuard`] copies a file aside before a risky sequence of edits and
//! puts it back when dropped, unless the caller disarms it first.

use crate::error::WriteError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Restores a file to its acquired contents on drop
#[derive(Debug)]
pub struct BackupGuard {
    original: PathBuf,
    copy: Option<NamedTempFile>,
}

impl BackupGuard {
    /// Copy `path` into a temp file beside it
    ///
    /// # Errors
    /// `WriteError::Io` if the file cannot be read or the copy written.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, WriteError> {
        let path = path.as_ref();
        let io = |e| WriteError::io_error(path, e);
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let copy = tempfile::Builder::new()
            .prefix(".pbx-backup-")
            .tempfile_in(dir)
            .map_err(io)?;
        fs::copy(path, copy.path()).map_err(io)?;
        tracing::debug!(path = %path.display(), backup = %copy.path().display(), "backup taken");
        Ok(Self {
            original: path.to_path_buf(),
            copy: Some(copy),
        })
    }

    /// Where the copy lives while the guard is armed
    #[must_use]
    pub fn backup_path(&self) -> Option<&Path> {
        self.copy.as_ref().map(NamedTempFile::path)
    }

    /// The file being protected
    #[must_use]
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Keep the current file and discard the copy
    pub fn disarm(mut self) {
        self.copy = None;
        tracing::debug!(path = %self.original.display(), "backup discarded");
    }

    /// Put the copy back now, consuming the guard
    ///
    /// # Errors
    /// `WriteError::Io` if the copy cannot be moved into place.
    pub fn restore(mut self) -> Result<(), WriteError> {
        self.put_back()
    }

    fn put_back(&mut self) -> Result<(), WriteError> {
        let Some(copy) = self.copy.take() else {
            return Ok(());
        };
        copy.persist(&self.original)
            .map_err(|e| WriteError::io_error(&self.original, e.error))?;
        tracing::info!(path = %self.original.display(), "restored manifest from backup");
        Ok(())
    }
}

impl Drop for BackupGuard {
    fn drop(&mut self) {
        if let Err(err) = self.put_back() {
            tracing::error!(path = %self.original.display(), %err, "failed to restore backup");
        }
    }
}

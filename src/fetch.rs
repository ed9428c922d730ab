//! Temporary files and scoped backend state
//!
//! [`Scratch`] owns every temporary file created during one diff run.
//! [`scoped`] runs a body against a backend resource and always releases
//! the resource afterward, including when the body fails or panics.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use scopeguard::ScopeGuard;
use tempfile::{Builder, TempDir, TempPath};

use crate::model::ChangeRecord;
use crate::scm::ScmError;
use crate::scm::changeset::Workspace;

/// Per-run temporary directory
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Result<Self, ScmError> {
        let dir = Builder::new().prefix("scmdiff-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a unique temporary file, optionally with content
    ///
    /// The file is deleted when the returned path is dropped.
    pub fn make_tempfile(&self, content: Option<&[u8]>) -> Result<TempPath, ScmError> {
        let mut file = Builder::new().prefix("tmp").tempfile_in(self.dir.path())?;

        if let Some(content) = content {
            file.write_all(content)?;
            file.flush()?;
        }

        Ok(file.into_temp_path())
    }

    /// Reserve a unique path that does not exist yet
    ///
    /// For tools that refuse to write over an existing file. Whatever ends
    /// up at the path is removed when the returned guard drops.
    pub fn reserve_path(&self) -> Result<ReservedPath, ScmError> {
        let path = self.make_tempfile(None)?;
        let path = path.keep().map_err(|e| ScmError::IoError(e.error))?;
        fs::remove_file(&path)?;
        Ok(ReservedPath { path })
    }
}

/// A path reserved inside a [`Scratch`] directory
#[derive(Debug)]
pub struct ReservedPath {
    path: PathBuf,
}

impl ReservedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever a tool wrote to the path
    pub fn read(&self) -> Result<Vec<u8>, ScmError> {
        Ok(fs::read(&self.path)?)
    }
}

impl Drop for ReservedPath {
    fn drop(&mut self) {
        if self.path.exists()
            && let Err(e) = fs::remove_file(&self.path)
        {
            log::debug!("Unable to remove {}: {e}", self.path.display());
        }
    }
}

/// Old content of a changed object
///
/// Captured content wins; otherwise the old revision is exported into the
/// scratch directory. Unmanaged objects have no old content.
pub fn old_content<W>(
    workspace: &mut W,
    scratch: &Scratch,
    record: &ChangeRecord,
) -> Result<Vec<u8>, ScmError>
where
    W: Workspace + ?Sized,
{
    if let Some(ref content) = record.original_content {
        return Ok(content.clone());
    }

    let Some(ref revision) = record.old_revision else {
        return Ok(Vec::new());
    };

    let dest = scratch.reserve_path()?;
    workspace.export_revision(record.path(), revision, dest.path())?;
    dest.read()
}

/// Run `body` against `target`, then `release` it exactly once
///
/// Release runs on success, on error, and during unwinding. A release
/// failure after a successful body becomes the result; after a failed body
/// it is logged and the body's error is returned.
pub fn scoped<W, T>(
    target: &mut W,
    release: impl Fn(&mut W) -> Result<(), ScmError>,
    body: impl FnOnce(&mut W) -> Result<T, ScmError>,
) -> Result<T, ScmError>
where
    W: ?Sized,
{
    let release = &release;
    let mut guard = scopeguard::guard(target, move |target| {
        if let Err(e) = release(target) {
            log::error!("Failed to restore state after an aborted operation: {e}");
        }
    });

    let result = body(&mut **guard);
    let target = ScopeGuard::into_inner(guard);

    match (result, release(target)) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_err)) => {
            log::error!("Failed to restore state: {release_err}");
            Err(e)
        }
    }
}

//! Changeset assembly
//!
//! Turns a workspace's status listing and directory diffs into an ordered
//! list of [`ChangeRecord`]s. The assembler only talks to the backend
//! through [`Workspace`], so any backend exposing object status, directory
//! diffs and revision lookups can reuse it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::fetch;
use crate::model::{ChangeRecord, ChangeStatus, ObjectKind, RevisionValue, split_path};

use super::ScmError;
use super::rename::{TreeEntry, TreeOps};

/// One object reported by a workspace status listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub path: String,
    pub kind: ObjectKind,
    /// Whether the object is under version control
    pub managed: bool,
    pub change_status: ChangeStatus,
}

/// Revision information for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRevision {
    pub path: String,
    pub revision: Option<RevisionValue>,
    /// Globally unique revision ID
    pub rev_id: Option<RevisionValue>,
}

/// Paths recorded in a changelist, relative to the workspace root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelist {
    pub adds: BTreeSet<String>,
    pub deletes: BTreeSet<String>,
    pub modifications: BTreeSet<String>,
}

impl Changelist {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty() && self.modifications.is_empty()
    }

    /// Parent directories of every path in the changelist
    pub fn parent_dirs(&self) -> BTreeSet<&str> {
        self.adds
            .iter()
            .chain(&self.deletes)
            .chain(&self.modifications)
            .map(|path| split_path(path).0)
            .collect()
    }
}

/// Backend operations the assembler needs
pub trait Workspace {
    /// Workspace root on disk
    fn root(&self) -> &Path;

    /// List object status for a selection
    fn list_status(&mut self, selection: &[String]) -> Result<Vec<StatusRecord>, ScmError>;

    /// Pending adds, deletes and renames directly inside a directory
    fn diff_directory(&mut self, dir: &str) -> Result<TreeOps, ScmError>;

    /// Revision information for a set of paths
    fn object_revisions(&mut self, paths: &[String]) -> Result<Vec<ObjectRevision>, ScmError>;

    /// Write the content of `path` at `revision` to `dest`
    ///
    /// `dest` does not exist beforehand.
    fn export_revision(
        &mut self,
        path: &str,
        revision: &RevisionValue,
        dest: &Path,
    ) -> Result<(), ScmError>;

    /// Temporarily restore a deleted object
    fn undelete(&mut self, path: &str) -> Result<(), ScmError>;

    /// Delete an object restored with [`Workspace::undelete`]
    fn redelete(&mut self, path: &str) -> Result<(), ScmError>;
}

/// Build the changeset for a selection, optionally limited to a changelist
///
/// Records come back sorted by (parent directory, name) of their current
/// path.
pub fn assemble<W>(
    workspace: &mut W,
    selection: &[String],
    changelist: Option<&Changelist>,
) -> Result<Vec<ChangeRecord>, ScmError>
where
    W: Workspace + ?Sized,
{
    let statuses = workspace.list_status(selection)?;
    let parent_dirs = changelist.map(Changelist::parent_dirs);

    let mut dir_items = Vec::new();
    let mut file_items = Vec::new();

    for status in statuses {
        if let Some(ref parent_dirs) = parent_dirs
            && !parent_dirs.contains(status.path.as_str())
            && !parent_dirs.contains(split_path(&status.path).0)
        {
            continue;
        }

        match status.kind {
            ObjectKind::Directory => dir_items.push(status),
            ObjectKind::File | ObjectKind::Symlink => file_items.push(status),
        }
    }

    let mut tree_ops = TreeOps::default();
    for item in &dir_items {
        match workspace.diff_directory(&item.path) {
            Ok(ops) => tree_ops.merge(ops),
            Err(e) => log::debug!("Unable to diff directory \"{}\": {e}", item.path),
        }
    }

    let mut files: BTreeMap<String, ChangeRecord> = BTreeMap::new();
    let mut pending_revisions: BTreeSet<String> = BTreeSet::new();

    for item in file_items {
        let record = match (item.change_status, item.managed) {
            (ChangeStatus::Modified, _) => {
                if changelist.is_some_and(|cl| !cl.modifications.contains(&item.path)) {
                    continue;
                }
                let old_path = tree_ops.renames.old_name(&item.path);
                ChangeRecord::modify(old_path, item.path.clone(), item.kind)
            }
            (ChangeStatus::NotApplicable, false) => {
                if changelist.is_some_and(|cl| !cl.adds.contains(&item.path)) {
                    continue;
                }
                ChangeRecord::create(item.path.clone(), item.kind)
            }
            (ChangeStatus::Deleted, _) => {
                if changelist.is_some_and(|cl| !cl.deletes.contains(&item.path)) {
                    continue;
                }
                ChangeRecord::delete(item.path.clone(), item.kind)
            }
            _ => {
                log::debug!(
                    "Skipping selected path \"{}\". Not a created, modified, or deleted file.",
                    item.path
                );
                continue;
            }
        };

        if record.old_path.is_some() {
            pending_revisions.insert(item.path.clone());
        }
        files.insert(item.path, record);
    }

    tree_ops.renames.expand_dirs(workspace.root());
    let mut moved_from = BTreeSet::new();

    for (new_path, old_path) in std::mem::take(&mut tree_ops.renames.files) {
        if let Some(changelist) = changelist {
            let is_added = changelist.adds.contains(&new_path);
            let is_deleted = changelist.deletes.contains(&old_path);

            match (is_added, is_deleted) {
                (false, false) => continue,
                (true, false) => {
                    tree_ops.adds.push(TreeEntry {
                        path: new_path,
                        kind: ObjectKind::File,
                    });
                    continue;
                }
                (false, true) => {
                    tree_ops.deletes.push(TreeEntry {
                        path: old_path,
                        kind: ObjectKind::File,
                    });
                    continue;
                }
                (true, true) => {}
            }
        } else if files.contains_key(&new_path) {
            continue;
        }

        // Both ends of the rename are accounted for: drop any standalone
        // delete of the old path so only the move remains.
        if files
            .get(&old_path)
            .is_some_and(|record| record.new_path.is_none())
        {
            files.remove(&old_path);
            pending_revisions.remove(&old_path);
        }

        moved_from.insert(old_path.clone());
        pending_revisions.insert(new_path.clone());
        files.insert(new_path.clone(), ChangeRecord::moved(old_path, new_path));
    }

    for entry in tree_ops.adds {
        if files.contains_key(&entry.path)
            || changelist.is_some_and(|cl| !cl.adds.contains(&entry.path))
        {
            continue;
        }

        let record = ChangeRecord::create(entry.path.clone(), entry.kind);
        files.insert(entry.path, record);
    }

    for entry in tree_ops.deletes {
        if files.contains_key(&entry.path)
            || moved_from.contains(&entry.path)
            || changelist.is_some_and(|cl| !cl.deletes.contains(&entry.path))
        {
            continue;
        }

        match read_deleted(workspace, &entry.path) {
            Ok((content, revision)) => {
                let mut record = ChangeRecord::delete(entry.path.clone(), entry.kind);
                record.original_content = Some(content);
                if let Some(revision) = revision {
                    record.old_revision = revision.revision;
                    record.old_object_id = revision.rev_id;
                }
                files.insert(entry.path, record);
            }
            Err(e) => {
                log::warn!(
                    "Unable to access information on deleted file \"{}\". \
                     This file will not be included in the diff. Error: {e}",
                    entry.path
                );
            }
        }
    }

    let pending: Vec<String> = pending_revisions.into_iter().collect();
    if !pending.is_empty() {
        for info in workspace.object_revisions(&pending)? {
            if let Some(record) = files.get_mut(&info.path) {
                record.old_revision = info.revision;
                record.old_object_id = info.rev_id;
            }
        }
    }

    let mut records: Vec<ChangeRecord> = files.into_values().collect();
    for record in &records {
        record.validate().map_err(|detail| ScmError::UnexpectedChange {
            path: record.path().to_string(),
            detail,
        })?;
    }
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    log::debug!("File information for diff: {records:?}");

    Ok(records)
}

/// Undelete an object, capture its content and revision, then delete it again
fn read_deleted<W>(
    workspace: &mut W,
    path: &str,
) -> Result<(Vec<u8>, Option<ObjectRevision>), ScmError>
where
    W: Workspace + ?Sized,
{
    workspace.undelete(path)?;

    fetch::scoped(
        workspace,
        |ws| ws.redelete(path),
        |ws| {
            let content = std::fs::read(ws.root().join(path))?;
            let revision = ws
                .object_revisions(&[path.to_string()])?
                .into_iter()
                .next();
            Ok((content, revision))
        },
    )
}

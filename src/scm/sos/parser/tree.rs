//! Directory diff parser (soscmd diff <dir>)

use std::collections::BTreeMap;

use crate::model::ObjectKind;
use crate::scm::rename::{TreeEntry, TreeOps};

use super::{Parser, TREE_ENTRY_REGEX};

/// Both sides of one object in a directory edit script
#[derive(Debug, Default)]
struct EntryChange<'a> {
    obj_type: &'a str,
    old_name: Option<&'a str>,
    new_name: Option<&'a str>,
}

impl Parser {
    /// Parse the edit script `soscmd diff <dir>` prints for a directory
    ///
    /// Entries are paired by object ID: an ID seen on both sides is a
    /// rename, one seen only on the old side is a delete, and one seen
    /// only on the new side is an add. Header lines are ignored.
    pub fn parse_directory_diff(dir: &str, output: &str) -> TreeOps {
        let mut changes: BTreeMap<&str, EntryChange> = BTreeMap::new();

        for line in output.lines() {
            let Some(caps) = TREE_ENTRY_REGEX.captures(line) else {
                continue;
            };

            let (Some(op), Some(obj_type), Some(name), Some(id)) = (
                caps.name("op"),
                caps.name("type"),
                caps.name("name"),
                caps.name("id"),
            ) else {
                continue;
            };

            let change = changes.entry(id.as_str()).or_insert_with(|| EntryChange {
                obj_type: obj_type.as_str(),
                ..Default::default()
            });

            if op.as_str() == "<" {
                change.old_name = Some(name.as_str());
            } else {
                change.new_name = Some(name.as_str());
            }
        }

        log::debug!("Directory diff parse results: {changes:?}");

        let mut ops = TreeOps::default();
        let join = |name: &str| format!("{}/{name}", dir.trim_end_matches('/'));

        for change in changes.into_values() {
            let kind = match change.obj_type {
                "D" => ObjectKind::Directory,
                "L" => ObjectKind::Symlink,
                _ => ObjectKind::File,
            };

            match (change.old_name.map(join), change.new_name.map(join)) {
                (Some(old), Some(new)) => match kind {
                    ObjectKind::File => {
                        ops.renames.files.insert(new, old);
                    }
                    ObjectKind::Directory => ops.renames.insert_dir(&new, &old),
                    ObjectKind::Symlink => {}
                },
                (Some(old), None) => ops.deletes.push(TreeEntry { path: old, kind }),
                (None, Some(new)) => ops.adds.push(TreeEntry { path: new, kind }),
                (None, None) => {}
            }
        }

        log::debug!(
            "Directory diff results for \"{dir}\": adds={:?}, deletes={:?}, renames={:?}",
            ops.adds,
            ops.deletes,
            ops.renames
        );

        ops
    }
}

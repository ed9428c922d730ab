//! Rename/move resolution
//!
//! Directory-level diffs report adds, deletes and renames of the entries
//! in one directory. [`TreeOps`] collects them across directories, and
//! [`RenameMap::expand_dirs`] turns renamed directories into file-level
//! renames before the changeset assembler consumes them.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::model::ObjectKind;

/// An object added or removed from a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: ObjectKind,
}

/// Renames found by directory diffs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    /// new file path -> old file path
    pub files: BTreeMap<String, String>,
    /// new directory -> old directory, both with a trailing `/`
    pub dirs: BTreeMap<String, String>,
}

impl RenameMap {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Record a directory rename, normalizing both sides to end in `/`
    pub fn insert_dir(&mut self, new_dir: &str, old_dir: &str) {
        self.dirs
            .insert(with_trailing_slash(new_dir), with_trailing_slash(old_dir));
    }

    /// Look up the old name of a path
    ///
    /// Explicit file renames win; otherwise the longest renamed directory
    /// prefix is swapped for its old name. Paths with no rename come back
    /// unchanged.
    pub fn old_name(&self, path: &str) -> String {
        if let Some(old) = self.files.get(path) {
            return old.clone();
        }

        self.dirs
            .iter()
            .filter(|(new_dir, _)| path.starts_with(new_dir.as_str()))
            .max_by_key(|(new_dir, _)| new_dir.len())
            .map(|(new_dir, old_dir)| format!("{old_dir}{}", &path[new_dir.len()..]))
            .unwrap_or_else(|| path.to_string())
    }

    /// Replace renamed directories with per-file renames
    ///
    /// Walks each renamed directory under `root` and records every file
    /// found as `old_dir + relative path`. Existing file-level entries are
    /// kept. Paths use the `./dir/file` workarea syntax.
    pub fn expand_dirs(&mut self, root: &Path) {
        let dirs = std::mem::take(&mut self.dirs);

        for (new_dir, old_dir) in &dirs {
            let walk_root = root.join(new_dir.trim_end_matches('/'));

            for entry in WalkDir::new(&walk_root)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let Ok(relative) = entry.path().strip_prefix(&walk_root) else {
                    continue;
                };
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                self.files
                    .entry(format!("{new_dir}{relative}"))
                    .or_insert_with(|| format!("{old_dir}{relative}"));
            }
        }
    }
}

/// Tree-level operations pending in one or more directories
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeOps {
    pub adds: Vec<TreeEntry>,
    pub deletes: Vec<TreeEntry>,
    pub renames: RenameMap,
}

impl TreeOps {
    /// Fold another directory's operations into this one
    pub fn merge(&mut self, other: TreeOps) {
        self.adds.extend(other.adds);
        self.deletes.extend(other.deletes);
        self.renames.files.extend(other.renames.files);
        self.renames.dirs.extend(other.renames.dirs);
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_old_name_prefers_file_rename() {
        let mut renames = RenameMap::default();
        renames.insert_dir("./src2", "./src");
        renames
            .files
            .insert("./src2/a.c".to_string(), "./lib/a.c".to_string());

        assert_eq!(renames.old_name("./src2/a.c"), "./lib/a.c");
        assert_eq!(renames.old_name("./src2/b.c"), "./src/b.c");
        assert_eq!(renames.old_name("./other/c.c"), "./other/c.c");
    }

    #[test]
    fn test_old_name_uses_longest_directory_prefix() {
        let mut renames = RenameMap::default();
        renames.insert_dir("./a", "./x");
        renames.insert_dir("./a/b", "./y");

        assert_eq!(renames.old_name("./a/b/file"), "./y/file");
        assert_eq!(renames.old_name("./a/file"), "./x/file");
    }

    #[test]
    fn test_directory_prefix_needs_separator() {
        let mut renames = RenameMap::default();
        renames.insert_dir("./src", "./old");

        assert_eq!(renames.old_name("./src2/file"), "./src2/file");
    }

    #[test]
    fn test_expand_dirs_walks_subtree() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("src2/subdir")).unwrap();
        fs::write(root.path().join("src2/testfile1"), b"1").unwrap();
        fs::write(root.path().join("src2/subdir/testfile2"), b"2").unwrap();

        let mut renames = RenameMap::default();
        renames.insert_dir("./src2", "./src");
        renames.expand_dirs(root.path());

        assert!(renames.dirs.is_empty());
        assert_eq!(
            renames.files.get("./src2/testfile1").map(String::as_str),
            Some("./src/testfile1")
        );
        assert_eq!(
            renames.files.get("./src2/subdir/testfile2").map(String::as_str),
            Some("./src/subdir/testfile2")
        );
    }

    #[test]
    fn test_expand_dirs_keeps_file_level_entries() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("new")).unwrap();
        fs::write(root.path().join("new/moved"), b"").unwrap();

        let mut renames = RenameMap::default();
        renames.insert_dir("./new", "./old");
        renames
            .files
            .insert("./new/moved".to_string(), "./elsewhere/orig".to_string());
        renames.expand_dirs(root.path());

        assert_eq!(renames.files["./new/moved"], "./elsewhere/orig");
    }

    #[test]
    fn test_expand_missing_dir_is_empty() {
        let root = TempDir::new().unwrap();
        let mut renames = RenameMap::default();
        renames.insert_dir("./gone", "./was");
        renames.expand_dirs(root.path());

        assert!(renames.is_empty());
    }
}

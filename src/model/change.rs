//! Changeset data model
//!
//! One [`ChangeRecord`] per affected filesystem object, as produced by the
//! changeset assembler and consumed by the diff writers.

use std::fmt;

use serde_json::Value;

/// Operation performed on an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOp {
    Create,
    Delete,
    Modify,
    Move,
    /// Moved and changed
    MoveModify,
}

impl ChangeOp {
    /// Name used in DiffX metadata
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOp::Create => "create",
            ChangeOp::Delete => "delete",
            ChangeOp::Modify => "modify",
            ChangeOp::Move => "move",
            ChangeOp::MoveModify => "move-modify",
        }
    }

    /// Whether the operation relates two existing paths
    pub fn has_both_paths(self) -> bool {
        matches!(
            self,
            ChangeOp::Modify | ChangeOp::Move | ChangeOp::MoveModify
        )
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of filesystem object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    File,
    Directory,
    Symlink,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::File => "file",
            ObjectKind::Directory => "directory",
            ObjectKind::Symlink => "symlink",
        }
    }
}

/// Backend-native change status, normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeStatus {
    Unchanged,
    Modified,
    Deleted,
    /// Status does not apply (unmanaged objects, directories)
    NotApplicable,
}

/// A revision or object identifier reported by a backend
///
/// Numeric values are kept as numbers so they serialize as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RevisionValue {
    Number(i64),
    Text(String),
}

impl RevisionValue {
    /// Parse a raw attribute value, preferring a number when it is one
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(number) => RevisionValue::Number(number),
            Err(_) => RevisionValue::Text(trimmed.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RevisionValue::Number(number) => Value::from(*number),
            RevisionValue::Text(text) => Value::from(text.as_str()),
        }
    }
}

impl fmt::Display for RevisionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionValue::Number(number) => write!(f, "{number}"),
            RevisionValue::Text(text) => f.write_str(text),
        }
    }
}

/// One row per affected filesystem object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Operation performed
    pub op: ChangeOp,

    /// Path before the change (backend path syntax)
    pub old_path: Option<String>,

    /// Path after the change (backend path syntax)
    pub new_path: Option<String>,

    /// Object kind
    pub kind: ObjectKind,

    /// Revision the old content is fetched from (None = unmanaged)
    pub old_revision: Option<RevisionValue>,

    /// Globally unique identifier of the old revision
    pub old_object_id: Option<RevisionValue>,

    /// Revision of the new content, when the backend knows one
    pub new_revision: Option<RevisionValue>,

    /// Normalized backend change status
    pub change_status: ChangeStatus,

    /// Old content captured up front (deleted objects)
    pub original_content: Option<Vec<u8>>,
}

impl ChangeRecord {
    fn base(op: ChangeOp, kind: ObjectKind, change_status: ChangeStatus) -> Self {
        Self {
            op,
            old_path: None,
            new_path: None,
            kind,
            old_revision: None,
            old_object_id: None,
            new_revision: None,
            change_status,
            original_content: None,
        }
    }

    /// A new, unmanaged object
    pub fn create(path: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            new_path: Some(path.into()),
            ..Self::base(ChangeOp::Create, kind, ChangeStatus::NotApplicable)
        }
    }

    /// A removed object
    pub fn delete(path: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            old_path: Some(path.into()),
            ..Self::base(ChangeOp::Delete, kind, ChangeStatus::Deleted)
        }
    }

    /// A modified object, moved when `old_path` differs from `new_path`
    pub fn modify(
        old_path: impl Into<String>,
        new_path: impl Into<String>,
        kind: ObjectKind,
    ) -> Self {
        let old_path = old_path.into();
        let new_path = new_path.into();
        let op = if old_path == new_path {
            ChangeOp::Modify
        } else {
            ChangeOp::Move
        };

        Self {
            old_path: Some(old_path),
            new_path: Some(new_path),
            ..Self::base(op, kind, ChangeStatus::Modified)
        }
    }

    /// A renamed object with no recorded content change
    pub fn moved(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            old_path: Some(old_path.into()),
            new_path: Some(new_path.into()),
            ..Self::base(ChangeOp::Move, ObjectKind::File, ChangeStatus::Unchanged)
        }
    }

    /// The path the object is known by now (new path, else old path)
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    /// Whether the record changes the object's name
    pub fn is_rename(&self) -> bool {
        matches!((&self.old_path, &self.new_path), (Some(old), Some(new)) if old != new)
    }

    /// Check the path invariants for the record's operation
    pub fn validate(&self) -> Result<(), String> {
        match (self.op, &self.old_path, &self.new_path) {
            (ChangeOp::Create, None, Some(_)) | (ChangeOp::Delete, Some(_), None) => Ok(()),
            (op, Some(_), Some(_)) if op.has_both_paths() => Ok(()),
            (op, old, new) => Err(format!(
                "operation {op} has old path {old:?} and new path {new:?}"
            )),
        }
    }

    /// Ordering key: (parent directory, name) of the current path
    pub fn sort_key(&self) -> (&str, &str) {
        split_path(self.path())
    }
}

/// Split a `/`-separated path into (parent, name)
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modify_with_same_paths_is_modify() {
        let record = ChangeRecord::modify("./README", "./README", ObjectKind::File);
        assert_eq!(record.op, ChangeOp::Modify);
        assert!(!record.is_rename());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_modify_with_renamed_path_is_move() {
        let record = ChangeRecord::modify("./old", "./new", ObjectKind::File);
        assert_eq!(record.op, ChangeOp::Move);
        assert!(record.is_rename());
    }

    #[test]
    fn test_validate_rejects_create_with_old_path() {
        let mut record = ChangeRecord::create("./new", ObjectKind::File);
        record.old_path = Some("./old".to_string());
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_move_without_new_path() {
        let mut record = ChangeRecord::moved("./a", "./b");
        record.new_path = None;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_sort_key_groups_by_parent_directory() {
        let mut records = vec![
            ChangeRecord::create("./src/sub/b", ObjectKind::File),
            ChangeRecord::create("./src/z", ObjectKind::File),
            ChangeRecord::delete("./README", ObjectKind::File),
        ];
        records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let paths: Vec<&str> = records.iter().map(|r| r.path()).collect();
        assert_eq!(paths, vec!["./README", "./src/z", "./src/sub/b"]);
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("./a/b"), ("./a", "b"));
        assert_eq!(split_path("file"), ("", "file"));
        assert_eq!(split_path("/root"), ("/", "root"));
    }

    #[test]
    fn test_revision_value_parse() {
        assert_eq!(RevisionValue::parse("26\n"), RevisionValue::Number(26));
        assert_eq!(
            RevisionValue::parse("1.2"),
            RevisionValue::Text("1.2".to_string())
        );
        assert_eq!(RevisionValue::Number(3).to_string(), "3");
    }
}

//! Diff statistics

use serde_json::{Map, Value};

/// Line counts accumulated over files, changes, or a whole diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Number of logical changes (only meaningful at the top level)
    pub changes: usize,
    pub files: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl AggregateStats {
    pub fn lines_changed(&self) -> usize {
        self.insertions + self.deletions
    }

    /// Fold another set of counts into this one
    pub fn absorb(&mut self, other: &AggregateStats) {
        self.changes += other.changes;
        self.files += other.files;
        self.insertions += other.insertions;
        self.deletions += other.deletions;
    }

    /// Stats block for a single file entry
    pub fn file_json(&self) -> Value {
        let mut map = self.line_counts();
        map.remove("files");
        Value::Object(map)
    }

    /// Stats block for a change section
    pub fn change_json(&self) -> Value {
        Value::Object(self.line_counts())
    }

    /// Stats block for the top-level metadata
    pub fn top_level_json(&self) -> Value {
        let mut map = self.line_counts();
        map.insert("changes".to_string(), Value::from(self.changes));
        Value::Object(map)
    }

    fn line_counts(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("deletions".to_string(), Value::from(self.deletions));
        map.insert("files".to_string(), Value::from(self.files));
        map.insert("insertions".to_string(), Value::from(self.insertions));
        map.insert("lines changed".to_string(), Value::from(self.lines_changed()));
        map
    }
}

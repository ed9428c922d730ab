//! DiffX container
//!
//! A small document model for the DiffX format: one top-level metadata
//! block, then change sections, each holding file sections with their own
//! metadata and diff content. [`DiffX::to_bytes`] writes the framed form.

use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::model::AggregateStats;
use crate::scm::ScmError;

const PREAMBLE: &[u8] = b"#diffx: encoding=utf-8, version=1.0\n";

static HUNK_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@").expect("Invalid hunk header regex")
});

/// Declared type of a file's diff content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    Text,
    Binary,
}

impl DiffType {
    fn as_str(self) -> &'static str {
        match self {
            DiffType::Text => "text",
            DiffType::Binary => "binary",
        }
    }
}

/// Line ending style of diff content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEndings {
    Unix,
    Dos,
}

impl LineEndings {
    /// Guess from content: DOS only when CRLF outnumbers bare LF
    pub fn guess(content: &[u8]) -> Self {
        let mut dos = 0usize;
        let mut unix = 0usize;

        for (i, &byte) in content.iter().enumerate() {
            if byte == b'\n' {
                if i > 0 && content[i - 1] == b'\r' {
                    dos += 1;
                } else {
                    unix += 1;
                }
            }
        }

        if dos > unix {
            LineEndings::Dos
        } else {
            LineEndings::Unix
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LineEndings::Unix => "unix",
            LineEndings::Dos => "dos",
        }
    }
}

/// A file section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffXFile {
    pub meta: Map<String, Value>,
    pub diff: Vec<u8>,
    /// Explicit diff type; binary content is always declared
    pub diff_type: Option<DiffType>,
}

impl DiffXFile {
    fn is_binary(&self) -> bool {
        self.diff_type == Some(DiffType::Binary)
    }
}

/// A change section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffXChange {
    pub meta: Map<String, Value>,
    pub files: Vec<DiffXFile>,
}

impl DiffXChange {
    pub fn add_file(&mut self, file: DiffXFile) -> &mut DiffXFile {
        self.files.push(file);
        let index = self.files.len() - 1;
        &mut self.files[index]
    }
}

/// A whole DiffX document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffX {
    pub meta: Map<String, Value>,
    pub changes: Vec<DiffXChange>,
}

impl DiffX {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_change(&mut self, meta: Map<String, Value>) -> &mut DiffXChange {
        self.changes.push(DiffXChange {
            meta,
            files: Vec::new(),
        });
        let index = self.changes.len() - 1;
        &mut self.changes[index]
    }

    /// Compute `stats` blocks for files, changes, and the document
    ///
    /// Files only get stats when they have text diff content. Every file
    /// section counts toward `files`.
    pub fn generate_stats(&mut self) {
        let mut total = AggregateStats::default();

        for change in &mut self.changes {
            let mut change_stats = AggregateStats::default();

            for file in &mut change.files {
                change_stats.files += 1;

                if file.diff.is_empty() || file.is_binary() {
                    continue;
                }

                let (insertions, deletions) = count_changed_lines(&file.diff);
                let file_stats = AggregateStats {
                    insertions,
                    deletions,
                    ..Default::default()
                };
                file.meta
                    .insert("stats".to_string(), file_stats.file_json());
                change_stats.absorb(&file_stats);
            }

            change
                .meta
                .insert("stats".to_string(), change_stats.change_json());
            total.absorb(&change_stats);
            total.changes += 1;
        }

        self.meta
            .insert("stats".to_string(), total.top_level_json());
    }

    /// Serialize to the framed DiffX byte form
    pub fn to_bytes(&self) -> Result<Vec<u8>, ScmError> {
        let mut out = PREAMBLE.to_vec();
        write_meta(&mut out, "#.meta", &self.meta)?;

        for change in &self.changes {
            out.extend_from_slice(b"#.change:\n");
            write_meta(&mut out, "#..meta", &change.meta)?;

            for file in &change.files {
                out.extend_from_slice(b"#..file:\n");
                write_meta(&mut out, "#...meta", &file.meta)?;

                if file.diff.is_empty() {
                    continue;
                }

                let mut header = format!(
                    "#...diff: length={}, line_endings={}",
                    file.diff.len(),
                    LineEndings::guess(&file.diff).as_str()
                );
                if let Some(diff_type) = file.diff_type {
                    header.push_str(", type=");
                    header.push_str(diff_type.as_str());
                }
                header.push('\n');

                out.extend_from_slice(header.as_bytes());
                out.extend_from_slice(&file.diff);
            }
        }

        Ok(out)
    }
}

/// Encode metadata as 4-space indented JSON with sorted keys and a trailing newline
pub fn encode_meta(meta: &Map<String, Value>) -> Result<Vec<u8>, ScmError> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    meta.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

fn write_meta(out: &mut Vec<u8>, header: &str, meta: &Map<String, Value>) -> Result<(), ScmError> {
    if meta.is_empty() {
        return Ok(());
    }

    let json = encode_meta(meta)?;
    out.extend_from_slice(format!("{header}: format=json, length={}\n", json.len()).as_bytes());
    out.extend_from_slice(&json);
    Ok(())
}

/// Count added and removed lines in unified diff text
///
/// Hunk bodies are consumed by their declared line counts, so removed
/// lines that happen to start with `--` are not mistaken for headers.
pub fn count_changed_lines(diff: &[u8]) -> (usize, usize) {
    let mut insertions = 0;
    let mut deletions = 0;
    let mut old_left = 0usize;
    let mut new_left = 0usize;

    for line in diff.split_inclusive(|&b| b == b'\n') {
        if old_left == 0 && new_left == 0 {
            if let Some(caps) = HUNK_HEADER_RE.captures(line) {
                old_left = range_len(caps.get(1).map(|m| m.as_bytes()));
                new_left = range_len(caps.get(2).map(|m| m.as_bytes()));
            }
            continue;
        }

        match line.first() {
            Some(b'+') => {
                insertions += 1;
                new_left = new_left.saturating_sub(1);
            }
            Some(b'-') => {
                deletions += 1;
                old_left = old_left.saturating_sub(1);
            }
            Some(b' ') => {
                old_left = old_left.saturating_sub(1);
                new_left = new_left.saturating_sub(1);
            }
            _ => {}
        }
    }

    (insertions, deletions)
}

fn range_len(raw: Option<&[u8]>) -> usize {
    raw.and_then(|raw| std::str::from_utf8(raw).ok())
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_encode_meta_sorted_and_indented() {
        let encoded = encode_meta(&meta(json!({"path": "README", "op": "modify"}))).unwrap();
        assert_eq!(
            String::from_utf8(encoded).unwrap(),
            "{\n    \"op\": \"modify\",\n    \"path\": \"README\"\n}\n"
        );
    }

    #[test]
    fn test_line_endings_guess() {
        assert_eq!(LineEndings::guess(b"a\nb\n"), LineEndings::Unix);
        assert_eq!(LineEndings::guess(b"a\r\nb\r\n"), LineEndings::Dos);
        assert_eq!(LineEndings::guess(b"a\r\nb\n"), LineEndings::Unix);
        assert_eq!(LineEndings::guess(b""), LineEndings::Unix);
    }

    #[test]
    fn test_count_changed_lines() {
        let diff = b"--- a\n+++ a\n@@ -1,2 +1,2 @@\n-old\n--- looks like a header\n+new\n+++ also content\n";
        assert_eq!(count_changed_lines(diff), (2, 2));
    }

    #[test]
    fn test_count_changed_lines_multiple_hunks() {
        let diff = b"--- a\n+++ a\n@@ -1 +1 @@\n-x\n+y\n@@ -10,2 +10,3 @@\n ctx\n+z\n ctx\n";
        assert_eq!(count_changed_lines(diff), (2, 1));
    }

    #[test]
    fn test_count_with_no_newline_marker() {
        let diff = b"--- f\n+++ f\n@@ -1 +1 @@\n-a\n\\ No newline at end of file\n+b\n";
        assert_eq!(count_changed_lines(diff), (1, 1));
    }

    #[test]
    fn test_stats_skip_binary_and_empty() {
        let mut diffx = DiffX::new();
        let change = diffx.add_change(Map::new());
        change.add_file(DiffXFile {
            meta: meta(json!({"op": "create", "path": "newfile"})),
            diff: b"--- /dev/null\n+++ newfile\n@@ -0,0 +1 @@\n+new file!\n".to_vec(),
            diff_type: None,
        });
        change.add_file(DiffXFile {
            meta: meta(json!({"op": "create", "path": "test.bin"})),
            diff: b"Binary files /dev/null and test.bin differ\n".to_vec(),
            diff_type: Some(DiffType::Binary),
        });
        change.add_file(DiffXFile {
            meta: meta(json!({"op": "delete", "path": "empty"})),
            ..Default::default()
        });
        diffx.generate_stats();

        let files = &diffx.changes[0].files;
        assert_eq!(files[0].meta["stats"]["insertions"], 1);
        assert!(files[1].meta.get("stats").is_none());
        assert!(files[2].meta.get("stats").is_none());
        assert_eq!(diffx.changes[0].meta["stats"]["files"], 3);
        assert_eq!(diffx.meta["stats"]["changes"], 1);
        assert_eq!(diffx.meta["stats"]["lines changed"], 1);
    }

    #[test]
    fn test_to_bytes_framing() {
        let mut diffx = DiffX::new();
        diffx.meta = meta(json!({"scm": "sos"}));
        let change = diffx.add_change(Map::new());
        change.add_file(DiffXFile {
            meta: meta(json!({"op": "create", "path": "test.bin"})),
            diff: b"Binary files /dev/null and test.bin differ\n".to_vec(),
            diff_type: Some(DiffType::Binary),
        });
        change.add_file(DiffXFile {
            meta: meta(json!({"op": "delete", "path": "trash/old.bin"})),
            ..Default::default()
        });

        let bytes = String::from_utf8(diffx.to_bytes().unwrap()).unwrap();
        assert_eq!(
            bytes,
            concat!(
                "#diffx: encoding=utf-8, version=1.0\n",
                "#.meta: format=json, length=21\n",
                "{\n    \"scm\": \"sos\"\n}\n",
                "#.change:\n",
                "#..file:\n",
                "#...meta: format=json, length=47\n",
                "{\n    \"op\": \"create\",\n    \"path\": \"test.bin\"\n}\n",
                "#...diff: length=43, line_endings=unix, type=binary\n",
                "Binary files /dev/null and test.bin differ\n",
                "#..file:\n",
                "#...meta: format=json, length=52\n",
                "{\n    \"op\": \"delete\",\n    \"path\": \"trash/old.bin\"\n}\n",
            )
        );
    }

    #[test]
    fn test_explicit_text_type_is_written() {
        let mut diffx = DiffX::new();
        diffx.add_change(Map::new()).add_file(DiffXFile {
            meta: Map::new(),
            diff: b"--- a\n+++ a\n@@ -1 +1 @@\n-x\n+y\n".to_vec(),
            diff_type: Some(DiffType::Text),
        });

        let bytes = String::from_utf8(diffx.to_bytes().unwrap()).unwrap();
        assert!(bytes.contains("#...diff: length=30, line_endings=unix, type=text\n"));
    }
}

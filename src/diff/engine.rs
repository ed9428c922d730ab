//! Per-file diff engine
//!
//! Line-based comparison of two byte buffers using `similar`, grouped into
//! unified-diff hunks.

use similar::{Algorithm, ChangeTag, TextDiff};

use crate::config::DEFAULT_CONTEXT_LINES;
use crate::model::{DiffResult, Hunk, HunkLine, HunkLineKind};

/// Compares file contents
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    context_lines: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_LINES)
    }
}

impl DiffEngine {
    pub fn new(context_lines: usize) -> Self {
        Self { context_lines }
    }

    /// Diff two buffers
    pub fn diff_bytes(&self, old: &[u8], new: &[u8]) -> DiffResult {
        if is_binary(old) || is_binary(new) {
            return if old == new {
                DiffResult::default()
            } else {
                DiffResult::binary()
            };
        }

        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_lines(old, new);

        let mut hunks = Vec::new();
        // Lines between hunks are equal, so the new side trails the old side
        // by the net insertions of the hunks written so far.
        let mut offset: isize = 0;

        for group in diff.grouped_ops(self.context_lines) {
            let changes: Vec<_> = group.iter().flat_map(|op| diff.iter_changes(op)).collect();
            let Some(first) = changes.first() else {
                continue;
            };

            // Only the index of the side a change belongs to is reliable.
            let (old_start, new_start) = match (first.old_index(), first.new_index()) {
                (Some(old), _) => (old, old.saturating_add_signed(offset)),
                (None, Some(new)) => (new.saturating_add_signed(-offset), new),
                (None, None) => continue,
            };

            let mut old_len = 0;
            let mut new_len = 0;
            let lines = changes
                .iter()
                .map(|change| {
                    let kind = match change.tag() {
                        ChangeTag::Equal => {
                            old_len += 1;
                            new_len += 1;
                            HunkLineKind::Context
                        }
                        ChangeTag::Delete => {
                            old_len += 1;
                            HunkLineKind::Removed
                        }
                        ChangeTag::Insert => {
                            new_len += 1;
                            HunkLineKind::Added
                        }
                    };
                    HunkLine {
                        kind,
                        content: change.value().to_vec(),
                    }
                })
                .collect();

            offset += new_len as isize - old_len as isize;
            hunks.push(Hunk {
                old_start,
                old_len,
                new_start,
                new_len,
                lines,
            });
        }

        DiffResult {
            is_binary: false,
            has_text_differences: !hunks.is_empty(),
            hunks,
        }
    }
}

/// Content is treated as binary when it contains a NUL byte
pub fn is_binary(content: &[u8]) -> bool {
    content.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_change() {
        let result = DiffEngine::default().diff_bytes(b"old line\n", b"new line\n");

        assert!(!result.is_binary);
        assert!(result.has_text_differences);
        assert_eq!(result.hunks.len(), 1);

        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len), (0, 1));
        assert_eq!((hunk.new_start, hunk.new_len), (0, 1));
        assert_eq!(hunk.deletions(), 1);
        assert_eq!(hunk.insertions(), 1);
    }

    #[test]
    fn test_identical_content_has_no_hunks() {
        let result = DiffEngine::default().diff_bytes(b"same\n", b"same\n");
        assert!(result.is_empty());
        assert!(result.hunks.is_empty());
    }

    #[test]
    fn test_new_file_against_empty() {
        let result = DiffEngine::default().diff_bytes(b"", b"new file!\n");
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len), (0, 0));
        assert_eq!((hunk.new_start, hunk.new_len), (0, 1));
        assert_eq!(result.insertions(), 1);
        assert_eq!(result.deletions(), 0);
    }

    #[test]
    fn test_distant_changes_split_into_hunks() {
        let old: Vec<u8> = (0..20).flat_map(|i| format!("line {i}\n").into_bytes()).collect();
        let new = String::from_utf8(old.clone())
            .unwrap()
            .replace("line 1\n", "LINE 1\n")
            .replace("line 18\n", "LINE 18\n");

        let result = DiffEngine::default().diff_bytes(&old, new.as_bytes());
        assert_eq!(result.hunks.len(), 2);
        assert_eq!(result.insertions(), 2);
        assert_eq!(result.deletions(), 2);
    }

    #[test]
    fn test_context_lines_setting() {
        let old = b"a\nb\nc\nd\ne\n";
        let new = b"a\nb\nX\nd\ne\n";

        let result = DiffEngine::new(1).diff_bytes(old, new);
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len), (1, 3));
    }

    #[test]
    fn test_null_byte_is_binary() {
        let result = DiffEngine::default().diff_bytes(b"\x00\x01", b"text\n");
        assert!(result.is_binary);
        assert!(!result.has_text_differences);
        assert!(result.hunks.is_empty());
    }

    #[test]
    fn test_identical_binary_is_unchanged() {
        let result = DiffEngine::default().diff_bytes(b"\x00", b"\x00");
        assert!(result.is_empty());
    }

    #[test]
    fn test_hunk_ranges_match_body_with_repeated_blank_lines() {
        let old = b"a\n\na\n\na\na\n\n\na\na\n\na\n\na\na\n\na\na\na\na";
        let new = b"\naa\nb\nb\n\nb\n\naa\n\nb\nb\n\n\naa\nb\n\nb\naa";

        let result = DiffEngine::default().diff_bytes(old, new);
        let old_lines = old.split_inclusive(|&b| b == b'\n').count();
        let new_lines = new.split_inclusive(|&b| b == b'\n').count();

        let mut next_old = 0;
        let mut next_new = 0;
        for hunk in &result.hunks {
            let body = |kind: HunkLineKind| hunk.lines.iter().filter(|l| l.kind != kind).count();
            assert_eq!(hunk.old_len, body(HunkLineKind::Added));
            assert_eq!(hunk.new_len, body(HunkLineKind::Removed));
            assert!(hunk.old_start >= next_old && hunk.new_start >= next_new);
            // Unchanged lines between hunks keep both sides aligned.
            assert_eq!(hunk.old_start - next_old, hunk.new_start - next_new);
            next_old = hunk.old_start + hunk.old_len;
            next_new = hunk.new_start + hunk.new_len;
        }
        assert_eq!(old_lines - next_old, new_lines - next_new);
    }

    #[test]
    fn test_pure_deletion_keeps_new_side_position() {
        let result = DiffEngine::new(0).diff_bytes(b"a\nb\nc\nd\n", b"a\nb\nd\n");
        let hunk = &result.hunks[0];
        assert_eq!((hunk.old_start, hunk.old_len), (2, 1));
        assert_eq!((hunk.new_start, hunk.new_len), (2, 0));
    }

    #[test]
    fn test_later_hunks_account_for_earlier_insertions() {
        let old: Vec<u8> = (0..20).flat_map(|i| format!("line {i}\n").into_bytes()).collect();
        let new = String::from_utf8(old.clone())
            .unwrap()
            .replace("line 1\n", "line 1\nextra\nextra\n")
            .replace("line 18\n", "LINE 18\n");

        let result = DiffEngine::default().diff_bytes(&old, new.as_bytes());
        assert_eq!(result.hunks.len(), 2);
        let last = &result.hunks[1];
        assert_eq!(last.new_start, last.old_start + 2);
    }

    #[test]
    fn test_missing_trailing_newline_is_kept() {
        let result = DiffEngine::default().diff_bytes(b"a\n", b"a\nb");
        let last = result.hunks[0].lines.last().unwrap();
        assert_eq!(last.content, b"b");
        assert!(last.missing_newline());
    }
}

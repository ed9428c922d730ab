//! Unified diff writer
//!
//! Produces GNU-style unified diff text for one file from a [`DiffResult`].

use crate::model::{DiffResult, Hunk};

/// Label used for the missing side of a created or deleted file
pub const DEV_NULL: &str = "/dev/null";

const NO_NEWLINE_MARKER: &[u8] = b"\\ No newline at end of file\n";

/// Accumulates unified diff output
#[derive(Debug, Default)]
pub struct UnifiedWriter {
    buf: Vec<u8>,
}

impl UnifiedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_file_headers(&mut self, old_label: &str, new_label: &str) {
        self.buf.extend_from_slice(b"--- ");
        self.buf.extend_from_slice(old_label.as_bytes());
        self.buf.extend_from_slice(b"\n+++ ");
        self.buf.extend_from_slice(new_label.as_bytes());
        self.buf.push(b'\n');
    }

    pub fn write_hunk(&mut self, hunk: &Hunk) {
        self.buf.extend_from_slice(
            format!(
                "@@ -{} +{} @@\n",
                format_range(hunk.old_start, hunk.old_len),
                format_range(hunk.new_start, hunk.new_len)
            )
            .as_bytes(),
        );

        for line in &hunk.lines {
            self.buf.push(line.kind.prefix());
            self.buf.extend_from_slice(&line.content);

            if line.missing_newline() {
                self.buf.push(b'\n');
                self.buf.extend_from_slice(NO_NEWLINE_MARKER);
            }
        }
    }

    pub fn write_binary_differs(&mut self, old_label: &str, new_label: &str) {
        self.buf.extend_from_slice(
            format!("Binary files {old_label} and {new_label} differ\n").as_bytes(),
        );
    }

    /// Write a raw line (index lines and the like)
    pub fn write_raw(&mut self, line: &[u8]) {
        self.buf.extend_from_slice(line);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Render a complete file diff, or nothing when there are no differences
pub fn render_file_diff(result: &DiffResult, old_label: &str, new_label: &str) -> Vec<u8> {
    let mut writer = UnifiedWriter::new();

    if result.is_binary {
        writer.write_binary_differs(old_label, new_label);
    } else if result.has_text_differences {
        writer.write_file_headers(old_label, new_label);
        for hunk in &result.hunks {
            writer.write_hunk(hunk);
        }
    }

    writer.into_bytes()
}

/// Format a hunk range the way GNU diff does
///
/// `start` is 0-based. A one-line range omits the count; an empty range
/// names the line before it.
pub fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

//! Per-file diff data model
//!
//! A [`DiffResult`] is produced fresh for each changed file and consumed
//! once by the diff writers.

/// Kind of a line inside a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkLineKind {
    Context,
    Removed,
    Added,
}

impl HunkLineKind {
    /// Unified diff line prefix
    pub fn prefix(self) -> u8 {
        match self {
            HunkLineKind::Context => b' ',
            HunkLineKind::Removed => b'-',
            HunkLineKind::Added => b'+',
        }
    }
}

/// A single line in a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: HunkLineKind,
    /// Line content including its terminator, if it had one
    pub content: Vec<u8>,
}

impl HunkLine {
    /// Whether the line is the last line of a file without a trailing newline
    pub fn missing_newline(&self) -> bool {
        !self.content.ends_with(b"\n")
    }
}

/// A contiguous group of changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 0-based index of the first old line covered
    pub old_start: usize,
    /// Number of old lines covered
    pub old_len: usize,
    /// 0-based index of the first new line covered
    pub new_start: usize,
    /// Number of new lines covered
    pub new_len: usize,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    pub fn insertions(&self) -> usize {
        self.count(HunkLineKind::Added)
    }

    pub fn deletions(&self) -> usize {
        self.count(HunkLineKind::Removed)
    }

    fn count(&self, kind: HunkLineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }
}

/// Result of comparing two versions of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Either side contained non-text bytes
    pub is_binary: bool,
    /// Text comparison found at least one changed line
    pub has_text_differences: bool,
    /// Hunks in file order (empty for binary or identical content)
    pub hunks: Vec<Hunk>,
}

impl DiffResult {
    pub fn binary() -> Self {
        Self {
            is_binary: true,
            has_text_differences: false,
            hunks: Vec::new(),
        }
    }

    /// Whether there is anything to write for this file
    pub fn is_empty(&self) -> bool {
        !self.is_binary && !self.has_text_differences
    }

    pub fn insertions(&self) -> usize {
        self.hunks.iter().map(Hunk::insertions).sum()
    }

    pub fn deletions(&self) -> usize {
        self.hunks.iter().map(Hunk::deletions).sum()
    }
}

//! Diff generation and output formats

mod diffx;
mod engine;
mod unified;

pub use diffx::{
    DiffType, DiffX, DiffXChange, DiffXFile, LineEndings, count_changed_lines, encode_meta,
};
pub use engine::{DiffEngine, is_binary};
pub use unified::{DEV_NULL, UnifiedWriter, format_range, render_file_diff};

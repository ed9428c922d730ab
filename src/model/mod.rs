//! Data models for scmdiff
//!
//! Backend-independent, request-scoped values: change records, per-file
//! diff results, and aggregate statistics.

mod change;
mod diff;
mod stats;

pub use change::{
    ChangeOp, ChangeRecord, ChangeStatus, ObjectKind, RevisionValue, split_path,
};
pub use diff::{DiffResult, Hunk, HunkLine, HunkLineKind};
pub use stats::AggregateStats;

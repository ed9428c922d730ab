//! ClearCase / VersionVault backend
//!
//! Changesets come from checkouts, UCM activities, baselines, branches,
//! labels, streams, or explicit version pairs. Directory elements are
//! diffed as name listings and their renames, additions and deletions are
//! folded back into the changeset by object ID.

mod changeset;
mod client;
pub mod constants;
mod diff;
mod entry;
pub mod parser;
mod revision;

pub use client::ClearCaseClient;
pub use entry::ChangesetEntry;
pub use revision::ClearCaseRevision;

use std::fmt;
use std::path::{Component, Path};

/// Kind of ClearCase view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Snapshot,
    Dynamic,
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewType::Snapshot => f.write_str("snapshot"),
            ViewType::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// Properties of the current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewProperties {
    pub view_type: ViewType,
    /// Whether the view is attached to a UCM stream
    pub is_ucm: bool,
}

/// `path` relative to `root`, resolving relative paths against `base`
///
/// Purely lexical: `.` components are dropped and `..` pops the previous
/// component.
pub fn relative_path(path: &str, base: &Path, root: &Path) -> String {
    let target = lexical_components(&base.join(path));
    let root = lexical_components(root);

    let common = target
        .iter()
        .zip(&root)
        .take_while(|(a, b)| a == b)
        .count();

    let parts: Vec<&str> = std::iter::repeat_n("..", root.len() - common)
        .chain(target[common..].iter().map(String::as_str))
        .collect();

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn lexical_components(path: &Path) -> Vec<String> {
    let mut parts = Vec::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    parts
}

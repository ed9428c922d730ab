//! Include/exclude path filtering
//!
//! Paths are compared in their normalized form (no leading `./`). Exclude
//! patterns are shell-style globs where `*` also matches `/`.

use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::scm::ScmError;

/// Filter built from include files and exclude patterns
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: BTreeSet<String>,
    exclude: Option<GlobSet>,
}

impl PathFilter {
    pub fn new(include_files: &[String], exclude_patterns: &[String]) -> Result<Self, ScmError> {
        let include = include_files
            .iter()
            .map(|path| normalize_path(path).to_string())
            .collect();

        let exclude = if exclude_patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in exclude_patterns {
                builder.add(
                    GlobBuilder::new(normalize_path(pattern))
                        .literal_separator(false)
                        .build()?,
                );
            }
            Some(builder.build()?)
        };

        Ok(Self { include, exclude })
    }

    /// Whether a path passes the filter
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_path(path);

        if !self.include.is_empty() && !self.include.contains(path) {
            return false;
        }

        match self.exclude {
            Some(ref exclude) => !exclude.is_match(path),
            None => true,
        }
    }
}

/// Strip a leading `./` from a workarea-relative path
pub fn normalize_path(path: &str) -> &str {
    path.strip_prefix("./").unwrap_or(path)
}

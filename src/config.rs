//! Library-level configuration
//!
//! The binary maps its command line onto these; library callers build them
//! directly.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use crate::scm::{CommandRunner, Executor, ProcessRunner};

/// Default number of context lines around each hunk
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Options for one diff run
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Restrict the diff to these paths (relative to the workarea root)
    pub include_files: Vec<String>,
    /// Shell-style glob patterns of paths to leave out
    pub exclude_patterns: Vec<String>,
    /// Context lines around each hunk
    pub context_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_files: Vec::new(),
            exclude_patterns: Vec::new(),
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

/// How backend tools are run
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Directory commands run in when a backend has no better choice
    pub cwd: Option<PathBuf>,
    /// Per-command timeout
    pub timeout: Option<Duration>,
    pub runner: Rc<dyn CommandRunner>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cwd: None,
            timeout: None,
            runner: Rc::new(ProcessRunner),
        }
    }
}

impl std::fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ExecutorConfig {
    /// Use a specific runner (tests, alternate transports)
    pub fn with_runner(runner: Rc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            ..Self::default()
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Build an executor for `program`
    pub fn executor(&self, program: &'static str) -> Executor {
        Executor::new(program, self.runner.clone())
            .with_cwd(self.cwd.clone())
            .with_timeout(self.timeout)
    }
}

/// ClearCase-specific settings
#[derive(Debug, Clone, Default)]
pub struct ClearCaseOptions {
    /// Emit legacy unified diffs instead of DiffX
    pub legacy: bool,
    /// VOB tags whose elements are considered (empty = current VOB only)
    pub vob_tags: Vec<String>,
}

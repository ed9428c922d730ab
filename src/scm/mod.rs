//! SCM backend layer
//!
//! Each supported SCM implements [`Backend`]. Backends run their tool
//! through an [`Executor`] and hand normalized changesets to the shared
//! diff writers.

pub mod changeset;
pub mod clearcase;
mod executor;
pub mod rename;
pub mod sos;

pub use executor::{
    CommandOutput, CommandRunner, Executor, Invocation, ProcessRunner, RunOptions,
    split_lines_bytes,
};

use std::fmt;
use std::io;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{ClearCaseOptions, DiffOptions, ExecutorConfig};
use clearcase::{ClearCaseClient, ClearCaseRevision};
use sos::{SosClient, SosRevision};

/// Errors raised while generating a diff
#[derive(Error, Debug)]
pub enum ScmError {
    #[error("{0} is not installed or not in PATH")]
    ToolNotFound(String),

    #[error("`{command}` failed (exit code {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("`{0}` timed out")]
    Timeout(String),

    #[error("Failed to parse {tool} output: {detail}")]
    ParseError { tool: &'static str, detail: String },

    #[error("{0}")]
    InvalidRevisionSpec(String),

    #[error("Too many revisions specified")]
    TooManyRevisions,

    #[error("Unexpected change for \"{path}\": {detail}")]
    UnexpectedChange { path: String, detail: String },

    #[error("{0}")]
    Unsupported(String),

    #[error("Not inside a {0} workspace")]
    NotAWorkspace(&'static str),

    #[error("{0}")]
    Backend(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Workarea database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Failed to encode metadata: {0}")]
    Json(#[from] serde_json::Error),
}

/// Supported SCM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScmKind {
    Sos,
    ClearCase,
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmKind::Sos => f.write_str("sos"),
            ScmKind::ClearCase => f.write_str("clearcase"),
        }
    }
}

impl FromStr for ScmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sos" => Ok(ScmKind::Sos),
            "clearcase" | "versionvault" => Ok(ScmKind::ClearCase),
            other => Err(format!("unknown SCM \"{other}\" (expected sos or clearcase)")),
        }
    }
}

/// Normalized revision arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionSpec {
    Sos(SosRevision),
    ClearCase(ClearCaseRevision),
}

/// Result of a diff run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffOutput {
    /// The diff artifact (empty when there is nothing to post)
    pub diff: Vec<u8>,
    /// Bookkeeping for the review request record
    pub extra_data: Option<Map<String, Value>>,
}

impl DiffOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.diff.is_empty()
    }
}

/// A source-control backend able to produce diffs
pub trait Backend {
    /// Backend identifier
    fn kind(&self) -> ScmKind;

    /// Validate and normalize user-supplied revision arguments
    fn parse_revision_spec(&mut self, revisions: &[String]) -> Result<RevisionSpec, ScmError>;

    /// Build the diff artifact for the given revisions
    fn diff(&mut self, revisions: &RevisionSpec, options: &DiffOptions)
    -> Result<DiffOutput, ScmError>;

    /// Whether the current tree matches a review request's stored extra data
    fn tree_matches_review_request(
        &mut self,
        _extra_data: &Map<String, Value>,
        _revisions: &RevisionSpec,
    ) -> Result<bool, ScmError> {
        Ok(false)
    }
}

/// Open a backend, detecting the SCM when `kind` is not given
pub fn open_backend(
    kind: Option<ScmKind>,
    config: &ExecutorConfig,
    clearcase: &ClearCaseOptions,
) -> Result<Box<dyn Backend>, ScmError> {
    match kind {
        Some(ScmKind::Sos) => Ok(Box::new(SosClient::open(config)?)),
        Some(ScmKind::ClearCase) => Ok(Box::new(ClearCaseClient::open(config, clearcase)?)),
        None => detect(config, clearcase),
    }
}

fn detect(
    config: &ExecutorConfig,
    clearcase: &ClearCaseOptions,
) -> Result<Box<dyn Backend>, ScmError> {
    match SosClient::open(config) {
        Ok(client) => return Ok(Box::new(client)),
        Err(e) => log::debug!("Not using SOS: {e}"),
    }

    match ClearCaseClient::open(config, clearcase) {
        Ok(client) => Ok(Box::new(client)),
        Err(e) => {
            log::debug!("Not using ClearCase: {e}");
            Err(ScmError::Backend(
                "No supported SCM workspace found in the current directory".to_string(),
            ))
        }
    }
}

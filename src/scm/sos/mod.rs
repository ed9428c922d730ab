//! Cliosoft SOS backend
//!
//! Runs `soscmd` against a workarea and produces DiffX output. Revision
//! arguments are either a selection (`select:<flags>`) or a changelist ID.

mod client;
pub mod constants;
mod diff;
/// Parser module (public for integration testing)
pub mod parser;

pub use client::SosClient;

use constants::{errors, selections, special};

use super::ScmError;

/// What to post from an SOS workarea
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SosRevision {
    /// Objects matching soscmd selection flags
    Selection {
        flags: Vec<String>,
        /// Whether the user chose the selection (`select:...`)
        explicit: bool,
    },
    /// Objects recorded in a changelist
    Changelist(String),
}

impl SosRevision {
    /// Parse revision arguments
    ///
    /// `supports_changelists` is only consulted for a bare argument.
    pub fn parse(
        revisions: &[String],
        supports_changelists: impl FnOnce() -> Result<bool, ScmError>,
    ) -> Result<Self, ScmError> {
        match revisions {
            [] => Ok(SosRevision::Selection {
                flags: selections::DEFAULT.iter().map(|s| s.to_string()).collect(),
                explicit: false,
            }),
            [revision] => {
                if let Some(flags) = revision.strip_prefix(special::SELECTION_PREFIX) {
                    Ok(SosRevision::Selection {
                        flags: flags
                            .split(' ')
                            .filter(|flag| !flag.is_empty())
                            .map(str::to_string)
                            .collect(),
                        explicit: true,
                    })
                } else if supports_changelists()? {
                    Ok(SosRevision::Changelist(revision.clone()))
                } else {
                    Err(ScmError::InvalidRevisionSpec(
                        errors::SELECTION_REQUIRED.to_string(),
                    ))
                }
            }
            _ => Err(ScmError::TooManyRevisions),
        }
    }

    pub fn changelist(&self) -> Option<&str> {
        match self {
            SosRevision::Changelist(id) => Some(id),
            SosRevision::Selection { .. } => None,
        }
    }
}

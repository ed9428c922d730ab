//! ClearCase revision arguments

use serde_json::{Value, json};

use crate::scm::ScmError;

use super::ViewType;
use super::constants::{errors, prefixes};

/// What a ClearCase diff compares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearCaseRevision {
    /// Everything the current user has checked out in this view
    CheckedOut,
    /// Versions recorded in a UCM activity
    Activity(String),
    /// A baseline against its predecessor, or two baselines (`name@pvob`)
    Baseline { base: String, other: Option<String> },
    /// Versions on a branch type
    Branch(String),
    /// A label against the latest versions, or two labels
    Label { base: String, other: Option<String> },
    /// Versions on the branch guarding a UCM stream (`name@pvob`)
    Stream(String),
    /// Explicit `old:new` extended path pairs
    Files(Vec<(String, String)>),
}

impl ClearCaseRevision {
    /// Parse user-supplied revisions
    ///
    /// Anything that is not one of the prefixed forms is read as a list of
    /// `old:new` pairs. Two revisions are only accepted in dynamic views.
    pub fn parse(revisions: &[String], view_type: ViewType) -> Result<Self, ScmError> {
        match revisions {
            [] => return Ok(ClearCaseRevision::CheckedOut),
            [revision] => {
                if let Some(activity) = revision.strip_prefix(prefixes::ACTIVITY) {
                    return Ok(ClearCaseRevision::Activity(activity.to_string()));
                }

                if let Some(baseline) = revision.strip_prefix(prefixes::BASELINE) {
                    require_pvob(baseline, "Baseline name")?;
                    return Ok(ClearCaseRevision::Baseline {
                        base: baseline.to_string(),
                        other: None,
                    });
                }

                if let Some(branch) = revision.strip_prefix(prefixes::BRANCH) {
                    return Ok(ClearCaseRevision::Branch(branch.to_string()));
                }

                if let Some(label) = revision.strip_prefix(prefixes::LABEL) {
                    return Ok(ClearCaseRevision::Label {
                        base: label.to_string(),
                        other: None,
                    });
                }

                if let Some(stream) = revision.strip_prefix(prefixes::STREAM) {
                    require_pvob(stream, "UCM stream name")?;
                    return Ok(ClearCaseRevision::Stream(stream.to_string()));
                }
            }
            [first, second] => {
                if view_type != ViewType::Dynamic {
                    return Err(ScmError::Unsupported(
                        errors::MULTIPLE_REVISIONS_NEED_DYNAMIC.to_string(),
                    ));
                }

                if let (Some(base), Some(other)) = (
                    first.strip_prefix(prefixes::BASELINE),
                    second.strip_prefix(prefixes::BASELINE),
                ) {
                    let base_pvob = require_pvob(base, "Baseline name")?;
                    let other_pvob = require_pvob(other, "Baseline name")?;

                    if base_pvob != other_pvob {
                        return Err(ScmError::InvalidRevisionSpec(format!(
                            "Baselines {base_pvob} and {other_pvob} do not have the same PVOB tag"
                        )));
                    }

                    return Ok(ClearCaseRevision::Baseline {
                        base: base.to_string(),
                        other: Some(other.to_string()),
                    });
                }

                if let (Some(base), Some(other)) = (
                    first.strip_prefix(prefixes::LABEL),
                    second.strip_prefix(prefixes::LABEL),
                ) {
                    return Ok(ClearCaseRevision::Label {
                        base: base.to_string(),
                        other: Some(other.to_string()),
                    });
                }
            }
            _ => {}
        }

        revisions
            .iter()
            .map(|revision| match revision.split(':').collect::<Vec<_>>().as_slice() {
                [old, new] => Ok((old.to_string(), new.to_string())),
                _ => Err(ScmError::InvalidRevisionSpec(format!(
                    "\"{revision}\" is not a valid file@revision pair"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(ClearCaseRevision::Files)
    }

    /// The `scope` block of the change metadata
    pub fn scope(&self) -> Value {
        let (name, scope_type) = match self {
            ClearCaseRevision::CheckedOut => ("checkout".to_string(), "checkout"),
            ClearCaseRevision::Activity(name) => (name.clone(), "activity"),
            ClearCaseRevision::Baseline { base, other: None } => {
                (base.clone(), "baseline/predecessor")
            }
            ClearCaseRevision::Baseline {
                base,
                other: Some(other),
            } => (format!("{base}/{other}"), "baseline/baseline"),
            ClearCaseRevision::Branch(name) => (name.clone(), "branch"),
            ClearCaseRevision::Label { base, other: None } => (base.clone(), "label/current"),
            ClearCaseRevision::Label {
                base,
                other: Some(other),
            } => (format!("{base}/{other}"), "label/label"),
            ClearCaseRevision::Stream(name) => (name.clone(), "stream"),
            ClearCaseRevision::Files(_) => ("changeset".to_string(), "changeset"),
        };

        json!({ "name": name, "type": scope_type })
    }
}

/// Split the PVOB tag off `name@pvob`
fn require_pvob<'a>(name: &'a str, what: &str) -> Result<&'a str, ScmError> {
    match name.rsplit_once('@') {
        Some((_, pvob)) => Ok(pvob),
        None => Err(ScmError::InvalidRevisionSpec(format!(
            "{what} {name} must include a PVOB tag"
        ))),
    }
}

//! One changed element and its lazily described versions

use crate::model::ChangeOp;
use crate::scm::{RunOptions, ScmError};

use super::ClearCaseClient;
use super::constants::{commands, flags, formats, prefixes, special};

/// Object ID reported for a missing side
const NO_OBJECT: &str = "0";

/// A changed element, described on demand
///
/// Object IDs, names and version names each cost a `cleartool describe`,
/// so they are looked up the first time they are needed and kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetEntry {
    /// Extended path of the old version
    pub old_path: Option<String>,
    /// Extended path of the new version
    pub new_path: Option<String>,
    pub op: ChangeOp,
    pub is_dir: bool,
    old_oid: Option<String>,
    new_oid: Option<String>,
    old_name: Option<String>,
    new_name: Option<String>,
    old_version: Option<String>,
    new_version: Option<String>,
}

impl ChangesetEntry {
    fn new(old_path: Option<String>, new_path: Option<String>, op: ChangeOp) -> Self {
        Self {
            old_path,
            new_path,
            op,
            is_dir: false,
            old_oid: None,
            new_oid: None,
            old_name: None,
            new_name: None,
            old_version: None,
            new_version: None,
        }
    }

    /// A modified element
    pub fn modified(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::new(Some(old_path.into()), Some(new_path.into()), ChangeOp::Modify)
    }

    /// A modified directory element
    pub fn directory(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            is_dir: true,
            ..Self::modified(old_path, new_path)
        }
    }

    pub fn created(new_path: impl Into<String>, new_oid: impl Into<String>) -> Self {
        Self {
            new_oid: Some(new_oid.into()),
            ..Self::new(None, Some(new_path.into()), ChangeOp::Create)
        }
    }

    pub fn deleted(old_path: impl Into<String>, old_oid: impl Into<String>) -> Self {
        Self {
            old_oid: Some(old_oid.into()),
            ..Self::new(Some(old_path.into()), None, ChangeOp::Delete)
        }
    }

    pub fn moved(
        old_path: impl Into<String>,
        old_oid: impl Into<String>,
        new_path: impl Into<String>,
        new_oid: impl Into<String>,
    ) -> Self {
        Self {
            old_oid: Some(old_oid.into()),
            new_oid: Some(new_oid.into()),
            ..Self::new(Some(old_path.into()), Some(new_path.into()), ChangeOp::Move)
        }
    }

    pub fn old_oid(&mut self, client: &ClearCaseClient) -> Result<String, ScmError> {
        if self.old_oid.is_none() {
            self.old_oid = Some(match self.old_path {
                Some(ref path) => client.describe(formats::OBJECT_ID, path)?,
                None => NO_OBJECT.to_string(),
            });
        }
        Ok(self.old_oid.clone().unwrap_or_default())
    }

    pub fn new_oid(&mut self, client: &ClearCaseClient) -> Result<String, ScmError> {
        if self.new_oid.is_none() {
            self.new_oid = Some(match self.new_path {
                Some(ref path) => client.describe(formats::OBJECT_ID, path)?,
                None => NO_OBJECT.to_string(),
            });
        }
        Ok(self.new_oid.clone().unwrap_or_default())
    }

    /// Element name of the old version, relative to the view root
    pub fn old_name(&mut self, client: &ClearCaseClient) -> Result<Option<String>, ScmError> {
        if self.old_name.is_none()
            && let Some(ref path) = self.old_path
        {
            let name = client.describe(formats::ELEMENT_NAME, path)?;
            self.old_name = Some(client.relative(&name));
        }
        Ok(self.old_name.clone())
    }

    /// Element name of the new version, relative to the view root
    pub fn new_name(&mut self, client: &ClearCaseClient) -> Result<Option<String>, ScmError> {
        if self.new_name.is_none()
            && let Some(ref path) = self.new_path
        {
            let name = client.describe(formats::ELEMENT_NAME, path)?;
            self.new_name = Some(client.relative(&name));
        }
        Ok(self.new_name.clone())
    }

    pub fn old_version(&mut self, client: &ClearCaseClient) -> Result<Option<String>, ScmError> {
        if self.old_version.is_none() && self.old_path.is_some() {
            let oid = self.old_oid(client)?;
            let selector = format!("{}{oid}", prefixes::OID);
            self.old_version = Some(client.describe(formats::VERSION_NAME, &selector)?);
        }
        Ok(self.old_version.clone())
    }

    /// Version name of the new version
    ///
    /// View-private files are not VOB objects yet and report as checked out.
    pub fn new_version(&mut self, client: &ClearCaseClient) -> Result<Option<String>, ScmError> {
        if self.new_version.is_none() && self.new_path.is_some() {
            let oid = self.new_oid(client)?;
            let selector = format!("{}{oid}", prefixes::OID);
            let output = client.run_with(
                &[commands::DESCRIBE, flags::FMT, formats::VERSION_NAME, &selector],
                &RunOptions::default().ignore_errors().with_errors(),
            )?;

            self.new_version = Some(if output.contains(special::NOT_A_VOB_OBJECT) {
                special::CHECKEDOUT.to_string()
            } else {
                output.trim().to_string()
            });
        }
        Ok(self.new_version.clone())
    }
}

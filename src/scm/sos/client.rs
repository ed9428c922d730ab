//! soscmd client
//!
//! Wraps `soscmd` invocations for one workarea and memoises the values
//! that do not change during a run.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;

use crate::config::ExecutorConfig;
use crate::model::{RevisionValue, split_path};
use crate::scm::changeset::{Changelist, ObjectRevision, StatusRecord, Workspace};
use crate::scm::rename::TreeOps;
use crate::scm::{Executor, RunOptions, ScmError};

use super::constants::{
    MIN_CHANGELIST_VERSION, NOBJSTATUS_BATCH_SIZE, SOSCMD, commands, flags, queries, special,
};
use super::parser::Parser;

/// Revision attribute value soscmd reports for unmanaged objects
const UNMANAGED_REVISION: &str = "?";

/// Values looked up once per client
#[derive(Debug, Default)]
struct QueryCache {
    queries: HashMap<&'static str, Option<String>>,
    version: Option<Option<(u32, u32)>>,
    supports_changelists: Option<bool>,
    workarea_id: Option<String>,
}

/// Client for one SOS workarea
#[derive(Debug)]
pub struct SosClient {
    soscmd: Executor,
    /// Directory the run started in; `soscmd query` and `version` run here
    launch_dir: PathBuf,
    wa_root: PathBuf,
    cache: QueryCache,
}

impl SosClient {
    /// Open the workarea containing the configured (or current) directory
    pub fn open(config: &ExecutorConfig) -> Result<Self, ScmError> {
        let launch_dir = match config.cwd {
            Some(ref cwd) => cwd.clone(),
            None => env::current_dir()?,
        };

        let mut client = Self {
            soscmd: config.executor(SOSCMD),
            launch_dir,
            wa_root: PathBuf::new(),
            cache: QueryCache::default(),
        };

        let wa_root = client
            .query(queries::WA_ROOT)?
            .ok_or(ScmError::NotAWorkspace("SOS"))?;

        log::debug!("Using SOS workarea {wa_root}");
        client.wa_root = PathBuf::from(wa_root);
        client.soscmd = client.soscmd.clone().with_cwd(Some(client.wa_root.clone()));

        Ok(client)
    }

    pub fn wa_root(&self) -> &Path {
        &self.wa_root
    }

    /// Run a soscmd subcommand in the workarea root
    pub(super) fn run(&self, args: &[&str]) -> Result<String, ScmError> {
        self.soscmd.run(args)
    }

    pub(super) fn run_bytes(&self, args: &[&str]) -> Result<Vec<u8>, ScmError> {
        self.soscmd.run_bytes(args, &RunOptions::default())
    }

    /// `soscmd query <info_type>`, memoised
    ///
    /// A failed or empty query yields `None`.
    pub fn query(&mut self, info_type: &'static str) -> Result<Option<String>, ScmError> {
        if let Some(value) = self.cache.queries.get(info_type) {
            return Ok(value.clone());
        }

        let (exit_code, output) = self.soscmd.run_status(
            &[commands::QUERY, info_type],
            &RunOptions::in_dir(&self.launch_dir),
        )?;

        let value = Some(output.trim())
            .filter(|value| exit_code == 0 && !value.is_empty())
            .map(str::to_string);

        self.cache.queries.insert(info_type, value.clone());
        Ok(value)
    }

    /// Like [`SosClient::query`], but a missing value is an error
    pub fn require(&mut self, info_type: &'static str) -> Result<String, ScmError> {
        self.query(info_type)?
            .ok_or_else(|| ScmError::Backend(format!("Unable to query the SOS {info_type}")))
    }

    /// Installed soscmd version as (major, minor)
    pub fn version(&mut self) -> Result<Option<(u32, u32)>, ScmError> {
        if let Some(version) = self.cache.version {
            return Ok(version);
        }

        let output = self.soscmd.run_with(
            &[commands::VERSION],
            &RunOptions::in_dir(&self.launch_dir),
        )?;
        let version = Parser::parse_version(&output);

        if version.is_none() {
            log::debug!("Unexpected result from \"soscmd version\": {:?}", output.trim());
        }

        self.cache.version = Some(version);
        Ok(version)
    }

    /// Whether changelists can be used
    ///
    /// Older pre-release builds lack the version but ship `soscmd describe`.
    pub fn supports_changelists(&mut self) -> Result<bool, ScmError> {
        if let Some(supported) = self.cache.supports_changelists {
            return Ok(supported);
        }

        let supported = match self.version()? {
            Some(version) if version >= MIN_CHANGELIST_VERSION => true,
            _ => self.run(&[commands::DESCRIBE]).is_ok(),
        };

        self.cache.supports_changelists = Some(supported);
        Ok(supported)
    }

    /// Workarea ID from the workarea metadata database
    pub fn workarea_id(&mut self) -> Result<String, ScmError> {
        if let Some(ref id) = self.cache.workarea_id {
            return Ok(id.clone());
        }

        let project = self.require(queries::PROJECT)?;
        let db_path = self
            .wa_root
            .join(".SOS")
            .join(".workareadb")
            .join(&project)
            .join(special::WORKAREA_DB);

        if !db_path.exists() {
            return Err(ScmError::Backend(format!(
                "Unable to determine workarea ID for \"{}\"",
                self.wa_root.display()
            )));
        }

        let conn = Connection::open(&db_path)?;
        let value: SqlValue = conn.query_row("SELECT waid FROM header", [], |row| row.get(0))?;

        let id = match value {
            SqlValue::Integer(id) => id.to_string(),
            SqlValue::Real(id) => id.to_string(),
            SqlValue::Text(id) => id,
            SqlValue::Null | SqlValue::Blob(_) => {
                return Err(ScmError::Backend(format!(
                    "Invalid workarea ID in {}",
                    db_path.display()
                )));
            }
        };

        self.cache.workarea_id = Some(id.clone());
        Ok(id)
    }

    /// Save the current selection into `dest`
    pub(super) fn stash_selection(&self, dest: &Path) -> Result<(), ScmError> {
        let output = self.run_bytes(&[commands::STATUS, flags::PATH_FORMAT])?;
        let selection = Parser::parse_selection(&output);

        log::debug!(
            "Stashing {} item(s) from current SOS selection",
            selection.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count()
        );

        fs::write(dest, selection)?;
        Ok(())
    }

    /// Restore a selection saved by [`SosClient::stash_selection`]
    pub(super) fn restore_selection(&self, source: &Path) -> Result<(), ScmError> {
        log::debug!("Restoring SOS selection");

        let [reset_all, no_recurse] = flags::SELECT_RESET;
        let select_file = format!("{}{}", flags::SELECT_FILE_PREFIX, source.display());
        self.run(&[commands::SELECT, reset_all, no_recurse, &select_file])?;
        Ok(())
    }

    /// Paths recorded in a changelist
    pub(super) fn changelist_paths(&self, id: &str) -> Result<Changelist, ScmError> {
        let output = self.run(&[commands::ADD, flags::SHOW, flags::CHANGELIST, id])?;
        Ok(Parser::parse_changelist(&output))
    }

    fn known_revision(value: Option<&RevisionValue>) -> Option<RevisionValue> {
        value
            .filter(|value| **value != RevisionValue::Text(UNMANAGED_REVISION.to_string()))
            .cloned()
    }
}

impl Workspace for SosClient {
    fn root(&self) -> &Path {
        &self.wa_root
    }

    fn list_status(&mut self, selection: &[String]) -> Result<Vec<StatusRecord>, ScmError> {
        let mut args = vec![commands::STATUS, flags::STATUS_FORMAT, flags::NO_HEADER];
        args.extend(selection.iter().map(String::as_str));

        let output = self.run_bytes(&args)?;
        Parser::parse_status(&output)
    }

    fn diff_directory(&mut self, dir: &str) -> Result<TreeOps, ScmError> {
        let output = self.run(&[commands::DIFF, dir])?;

        // soscmd leaves its report behind in the diffed directory
        let report = self.wa_root.join(dir).join(special::DIFF_OUT_FILE);
        if let Err(e) = fs::remove_file(&report) {
            log::debug!("Unable to remove {}: {e}", report.display());
        }

        Ok(Parser::parse_directory_diff(dir, &output))
    }

    fn object_revisions(&mut self, paths: &[String]) -> Result<Vec<ObjectRevision>, ScmError> {
        let mut paths = paths.to_vec();
        paths.sort();

        let mut revisions = Vec::with_capacity(paths.len());

        for batch in paths.chunks(NOBJSTATUS_BATCH_SIZE) {
            let mut args = vec![commands::NOBJSTATUS, flags::UNCLOSED];
            args.extend(flags::REVISION_ATTRIBUTES);
            args.extend(batch.iter().map(String::as_str));

            let output = self.run(&args)?;

            for record in Parser::parse_nobjstatus(&output)? {
                revisions.push(ObjectRevision {
                    revision: Self::known_revision(record.attribute("Revision")),
                    rev_id: Self::known_revision(record.attribute("RevId")),
                    path: record.filename,
                });
            }
        }

        Ok(revisions)
    }

    fn export_revision(
        &mut self,
        path: &str,
        revision: &RevisionValue,
        dest: &Path,
    ) -> Result<(), ScmError> {
        let source = format!("{path}{}{revision}", special::REVISION_SEPARATOR);
        let out = format!("{}{}", flags::OUT_PREFIX, dest.display());
        self.run(&[commands::EXPORTREV, &source, &out])?;
        Ok(())
    }

    fn undelete(&mut self, path: &str) -> Result<(), ScmError> {
        let (dir, name) = split_path(path);
        self.run(&[commands::UNDELETE, dir, name])?;
        Ok(())
    }

    fn redelete(&mut self, path: &str) -> Result<(), ScmError> {
        self.run(&[commands::DELETE, path])?;
        Ok(())
    }
}

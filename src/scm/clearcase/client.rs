//! cleartool client
//!
//! Detects the current view and wraps the `cleartool` queries the changeset
//! sources and diff writers share.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ClearCaseOptions, ExecutorConfig};
use crate::fetch::Scratch;
use crate::scm::{Executor, RunOptions, ScmError};

use super::constants::{CLEARTOOL, commands, errors, flags, formats, prefixes, special};
use super::parser::Parser;
use super::{ViewProperties, ViewType, relative_path};

/// Client for one ClearCase view
#[derive(Debug)]
pub struct ClearCaseClient {
    cleartool: Executor,
    /// Directory the run started in; relative element paths resolve here
    launch_dir: PathBuf,
    view_name: String,
    root_path: PathBuf,
    vobtag: String,
    /// VOBs considered by `-avobs` queries
    vob_tags: Vec<String>,
    view: ViewProperties,
    legacy: bool,
    host_properties: Option<BTreeMap<String, String>>,
}

impl ClearCaseClient {
    /// Open the view containing the configured (or current) directory
    pub fn open(config: &ExecutorConfig, options: &ClearCaseOptions) -> Result<Self, ScmError> {
        let launch_dir = match config.cwd {
            Some(ref cwd) => cwd.clone(),
            None => env::current_dir()?,
        };
        let cleartool = config.executor(CLEARTOOL).with_cwd(Some(launch_dir.clone()));

        let view_name = cleartool
            .run(&[commands::PWV, flags::SHORT])?
            .trim()
            .to_string();
        if view_name.starts_with(special::NO_VIEW) {
            return Err(ScmError::NotAWorkspace("ClearCase view"));
        }

        let ignore = RunOptions::default().ignore_errors();

        let root_path = cleartool
            .run_with(&[commands::PWV, flags::ROOT], &ignore)?
            .trim()
            .to_string();
        if root_path.contains(special::ERROR_MARKER) {
            return Err(ScmError::Backend(errors::NOT_IN_VIEW.to_string()));
        }

        let vobtag = cleartool
            .run_with(&[commands::DESCRIBE, flags::SHORT, prefixes::CURRENT_VOB], &ignore)?
            .trim()
            .to_string();
        if vobtag.contains(special::ERROR_MARKER) {
            return Err(ScmError::Backend(errors::UNKNOWN_VOB.to_string()));
        }

        let mut args = vec![commands::LSVIEW];
        args.extend(flags::VIEW_PROPERTIES);
        let view = Parser::parse_view_properties(&cleartool.run(&args)?)?;

        let vob_tags = if options.vob_tags.is_empty() {
            vec![vobtag.clone()]
        } else {
            options.vob_tags.clone()
        };

        log::debug!(
            "Using ClearCase {} view {view_name} (UCM: {}), VOB {vobtag}",
            view.view_type,
            view.is_ucm
        );

        Ok(Self {
            cleartool,
            launch_dir,
            view_name,
            root_path: PathBuf::from(root_path),
            vobtag,
            vob_tags,
            view,
            legacy: options.legacy,
            host_properties: None,
        })
    }

    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    pub fn view(&self) -> ViewProperties {
        self.view
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn vobtag(&self) -> &str {
        &self.vobtag
    }

    pub fn vob_tags(&self) -> &[String] {
        &self.vob_tags
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Filesystem path of the current VOB
    pub fn local_path(&self) -> PathBuf {
        self.root_path.join(self.vobtag.trim_start_matches('/'))
    }

    pub(super) fn run(&self, args: &[&str]) -> Result<String, ScmError> {
        self.cleartool.run(args)
    }

    pub(super) fn run_with(&self, args: &[&str], options: &RunOptions) -> Result<String, ScmError> {
        self.cleartool.run_with(args, options)
    }

    /// `cleartool describe -fmt <format> <target>`, trimmed
    pub(super) fn describe(&self, format: &str, target: &str) -> Result<String, ScmError> {
        Ok(self
            .run(&[commands::DESCRIBE, flags::FMT, format, target])?
            .trim()
            .to_string())
    }

    /// Object ID of an element version
    pub(super) fn object_id(&self, target: &str) -> Result<String, ScmError> {
        Ok(self
            .run(&[commands::DESC, flags::FMT, formats::OBJECT_ID, target])?
            .trim()
            .to_string())
    }

    /// Options that point `-avobs` queries at the configured VOBs
    pub(super) fn avobs_options(&self, vob_tags: &[String]) -> RunOptions {
        RunOptions::default()
            .env(special::AVOBS_ENV, vob_tags.join(special::AVOBS_SEPARATOR))
            .ignoring(&[1])
    }

    /// Host properties from `cleartool hostinfo -l`, fetched once
    pub(super) fn host_properties(&mut self) -> Result<&BTreeMap<String, String>, ScmError> {
        if self.host_properties.is_none() {
            let output = self.run(&[commands::HOSTINFO, flags::HOST_DETAILS])?;
            self.host_properties = Some(Parser::parse_host_info(&output)?);
        }

        Ok(self.host_properties.get_or_insert_default())
    }

    /// Predecessor of `path@@branch/number` as (branch, number)
    ///
    /// Versions can be removed with `rmver`, so the predecessor is asked
    /// for instead of decrementing the number.
    pub(super) fn predecessor(
        &self,
        path: &str,
        branch: &str,
        number: u64,
    ) -> Result<(String, String), ScmError> {
        let extended = format!(
            "{path}{}{}",
            special::EXTENDED_SEPARATOR,
            Parser::join_version(branch, &number.to_string())
        );

        let previous = self
            .run_with(
                &[commands::DESC, flags::FMT, formats::PREDECESSOR, &extended],
                &RunOptions::default().ignore_errors(),
            )?
            .trim()
            .to_string();

        if previous.contains("Error") {
            return Err(ScmError::Backend(format!(
                "Unable to find the predecessor version for {extended}"
            )));
        }

        let (branch, number) = Parser::split_version(&previous);
        Ok((branch.to_string(), number.to_string()))
    }

    /// Whether `label` exists, optionally restricted to a VOB
    pub(super) fn is_a_label(&self, label: &str, vobtag: Option<&str>) -> Result<bool, ScmError> {
        let (name, label_vobtag) = match label.rsplit_once('@') {
            Some((name, tag)) => (name, Some(tag)),
            None => (label, None),
        };

        if let (Some(expected), Some(actual)) = (vobtag, label_vobtag)
            && expected != actual
        {
            return Err(ScmError::InvalidRevisionSpec(format!(
                "label vobtag {actual} does not match expected vobtag {expected}"
            )));
        }

        let name = name.strip_prefix(prefixes::LABEL).unwrap_or(name);
        let selector = match vobtag {
            Some(tag) => format!("{}{name}@{tag}", prefixes::LABEL),
            None => format!("{}{name}", prefixes::LABEL),
        };

        let output = self.run_with(
            &[commands::DESCRIBE, flags::SHORT, &selector],
            &RunOptions::default().ignoring(&[1]),
        )?;
        Ok(!output.trim().is_empty())
    }

    /// Whether an element version is a directory
    pub(super) fn is_dir(&self, path: &str) -> Result<bool, ScmError> {
        let local = self.launch_dir.join(path);

        if self.view.view_type == ViewType::Dynamic && local.exists() {
            return Ok(local.is_dir());
        }

        Ok(self
            .describe(formats::OBJECT_KIND, path)?
            .starts_with("directory"))
    }

    /// Whether an element version can be read straight from the view
    pub(super) fn is_readable(&self, path: &str) -> bool {
        self.view.view_type == ViewType::Snapshot || self.launch_dir.join(path).exists()
    }

    /// Element path relative to the view root
    pub(super) fn relative(&self, path: &str) -> String {
        relative_path(path, &self.launch_dir, &self.root_path)
    }

    /// Content of an element version, or nothing for a missing side
    ///
    /// Snapshot views only hold the loaded versions, so other versions are
    /// fetched with `cleartool get`.
    pub(super) fn content(&self, path: Option<&str>, scratch: &Scratch) -> Result<Vec<u8>, ScmError> {
        let Some(path) = path else {
            return Ok(Vec::new());
        };

        match self.view.view_type {
            ViewType::Dynamic => Ok(fs::read(self.launch_dir.join(path))?),
            ViewType::Snapshot => {
                let dest = scratch.reserve_path()?;
                let dest_arg = dest.path().to_string_lossy().into_owned();
                self.run(&[commands::GET, flags::TO, &dest_arg, path])?;
                dest.read()
            }
        }
    }

    /// Sorted entry names of a directory version, one per line
    pub(super) fn directory_listing(&self, path: Option<&str>) -> Result<Vec<u8>, ScmError> {
        let Some(path) = path else {
            return Ok(Vec::new());
        };

        let mut args = vec![commands::LS];
        args.extend(flags::LIST_NAMES);
        args.push(path);

        let output = self.cleartool.run_bytes(&args, &RunOptions::default())?;
        Ok(Parser::parse_directory_listing(&output))
    }
}

//! cleartool output parser
//!
//! Parses the output from cleartool commands into structured data.

mod changeset;
mod directory;

pub use changeset::{LabelElement, VersionTriple};
pub use directory::DirectoryDiff;


use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::scm::ScmError;

use super::constants::{errors, host, special};
use super::{ViewProperties, ViewType};

/// Regex for a checked-out version name
/// Example: `CHECKEDOUT`, `CHECKEDOUT.78`
static CHECKEDOUT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CHECKEDOUT(\.\d+)?$").expect("Invalid checkedout regex"));

/// Parser for cleartool output
pub struct Parser;

impl Parser {
    /// Parse the `Properties:` line of `cleartool lsview -full -properties -cview`
    ///
    /// Automatic views and webviews also list `snapshot`, so they are
    /// rejected before the view type is read.
    pub fn parse_view_properties(output: &str) -> Result<ViewProperties, ScmError> {
        let properties: Vec<&str> = output
            .lines()
            .map(|line| line.trim_end().split(' ').collect::<Vec<_>>())
            .find(|words| words.first() == Some(&"Properties:"))
            .ok_or_else(|| ScmError::Backend(errors::UNKNOWN_VIEW_TYPE.to_string()))?;

        let has = |property: &str| properties.contains(&property);

        if has("automatic") || has("webview") {
            return Err(ScmError::Unsupported(errors::UNSUPPORTED_VIEW.to_string()));
        }

        let view_type = if has("snapshot") {
            ViewType::Snapshot
        } else if has("dynamic") {
            ViewType::Dynamic
        } else {
            return Err(ScmError::Backend(errors::UNKNOWN_VIEW_TYPE.to_string()));
        };

        Ok(ViewProperties {
            view_type,
            is_ucm: has("ucmview"),
        })
    }

    /// Parse `cleartool hostinfo -l` into key/value properties
    ///
    /// `Product` is also split into `Product name` and `Product version`.
    pub fn parse_host_info(output: &str) -> Result<BTreeMap<String, String>, ScmError> {
        if output.lines().any(|line| line.trim() == "Error") {
            return Err(ScmError::Backend(
                "Unable to determine the current region".to_string(),
            ));
        }

        let mut properties: BTreeMap<String, String> = output
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect();

        if let Some((name, version)) = properties
            .get(host::PRODUCT)
            .and_then(|product| product.split_once(' '))
            .map(|(name, version)| (name.to_string(), version.to_string()))
        {
            properties.insert(host::PRODUCT_NAME.to_string(), name);
            properties.insert(host::PRODUCT_VERSION.to_string(), version);
        }

        Ok(properties)
    }

    /// Whether a version name refers to a checked-out version
    pub fn is_checkedout(version: &str) -> bool {
        CHECKEDOUT_REGEX.is_match(version)
    }

    /// Split a version path into branch path and version number
    ///
    /// `/main/int/3` becomes (`/main/int`, `3`).
    pub fn split_version(version: &str) -> (&str, &str) {
        match version.rsplit_once('/') {
            Some((branch, number)) => (branch, number),
            None => ("", version),
        }
    }

    /// Numeric version of a version path; checked-out versions sort last
    pub fn version_number(version: &str) -> Result<u64, ScmError> {
        let (_, number) = Self::split_version(version);

        if Self::is_checkedout(number) {
            return Ok(u64::MAX);
        }

        number.parse().map_err(|_| ScmError::ParseError {
            tool: "cleartool",
            detail: format!("invalid version {version:?}"),
        })
    }

    /// `path@@version`, or just `path` for checked-out (or missing) versions
    pub fn extended_path(path: &str, version: &str) -> String {
        if version.is_empty() || Self::is_checkedout(version) {
            path.to_string()
        } else {
            format!("{path}{}{version}", special::EXTENDED_SEPARATOR)
        }
    }

    /// Join a branch path and a version number
    pub fn join_version(branch: &str, number: &str) -> String {
        format!("{}/{number}", branch.trim_end_matches('/'))
    }

    /// Basenames of a `cleartool ls -short -nxname -vob_only` listing
    ///
    /// One sorted name per line, newline-terminated, ready to be diffed.
    pub fn parse_directory_listing(output: &[u8]) -> Vec<u8> {
        let mut names: Vec<&[u8]> = output
            .split(|&b| b == b'\n')
            .map(<[u8]>::trim_ascii)
            .filter(|line| !line.is_empty())
            .map(|line| match line.iter().rposition(|&b| b == b'/') {
                Some(slash) => &line[slash + 1..],
                None => line,
            })
            .collect();
        names.sort();

        let mut listing = Vec::new();
        for name in names {
            listing.extend_from_slice(name);
            listing.push(b'\n');
        }
        listing
    }

    /// The guarding branch type from `cleartool describe -long stream:<name>`
    ///
    /// `  Guarding: brtype:dev@/vobs/pvob` yields `dev@/vobs/pvob`.
    pub fn parse_stream_branch(output: &str) -> Option<String> {
        output
            .lines()
            .find(|line| line.starts_with(special::GUARDING_PREFIX))
            .and_then(|line| line.trim().splitn(3, ':').nth(2))
            .map(|branch| branch.trim().to_string())
            .filter(|branch| !branch.is_empty())
    }
}

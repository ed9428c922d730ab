//! Changeset sources
//!
//! Each revision form lists the element versions it covers as
//! (old extended path, new extended path) pairs.

use std::collections::HashMap;

use crate::scm::{RunOptions, ScmError};

use super::constants::{commands, flags, formats, prefixes, special};
use super::parser::{LabelElement, Parser, VersionTriple};
use super::{ClearCaseClient, ClearCaseRevision};

/// (old extended path, new extended path)
pub type VersionPair = (String, String);

/// Insertion-ordered map keyed by element path
struct ByPath<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> ByPath<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn get(&self, path: &str) -> Option<&T> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    fn entry_or_insert_with(&mut self, path: &str, value: impl FnOnce() -> T) -> &mut T {
        let i = match self.index.get(path) {
            Some(&i) => i,
            None => {
                self.entries.push((path.to_string(), value()));
                self.index.insert(path.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[i].1
    }

    fn insert(&mut self, path: &str, value: T) {
        match self.index.get(path) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.entries.push((path.to_string(), value));
                self.index.insert(path.to_string(), self.entries.len() - 1);
            }
        }
    }

    fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }
}

impl<T> IntoIterator for ByPath<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Versions of one element seen in an activity
struct ActivityRange {
    highest: u64,
    lowest: u64,
    current: String,
}

/// First and last versions of one element on a branch
struct BranchRange {
    highest: u64,
    previous: String,
    current: String,
}

impl ClearCaseClient {
    /// Version pairs covered by a revision
    pub(super) fn changeset(
        &self,
        revision: &ClearCaseRevision,
    ) -> Result<Vec<VersionPair>, ScmError> {
        match revision {
            ClearCaseRevision::CheckedOut => self.checkedout_changeset(),
            ClearCaseRevision::Activity(activity) => self.activity_changeset(activity),
            ClearCaseRevision::Baseline { base, other } => {
                self.baseline_changeset(base, other.as_deref())
            }
            ClearCaseRevision::Branch(branch) => self.branch_changeset(branch),
            ClearCaseRevision::Label { base, other } => self
                .label_changeset(base, other.as_deref())
                .map_err(|e| ScmError::Backend(format!("Label comparison failed:\n{e}"))),
            ClearCaseRevision::Stream(stream) => self.stream_changeset(stream),
            ClearCaseRevision::Files(pairs) => Ok(pairs.clone()),
        }
    }

    /// Versions the current user has checked out in this view
    fn checkedout_changeset(&self) -> Result<Vec<VersionPair>, ScmError> {
        let output = self.run_with(
            &[
                commands::LSCHECKOUT,
                flags::ALL_VOBS,
                flags::CURRENT_VIEW,
                flags::ME,
                flags::FMT,
                formats::CHECKOUT,
            ],
            &self.avobs_options(self.vob_tags()),
        )?;

        Ok(Parser::parse_version_triples(&output)?
            .into_iter()
            .map(|triple| {
                (
                    Parser::extended_path(&triple.path, &triple.previous),
                    Parser::extended_path(&triple.path, &triple.current),
                )
            })
            .collect())
    }

    /// Versions recorded in a UCM activity, rebases included
    fn activity_changeset(&self, activity: &str) -> Result<Vec<VersionPair>, ScmError> {
        let output = self.run_with(
            &[
                commands::LSACTIVITY,
                flags::FMT,
                formats::ACTIVITY_VERSIONS,
                activity,
            ],
            &RunOptions::default().ignoring(&[1]),
        )?;

        self.sanitize_activity(&Parser::parse_activity_versions(&output))
    }

    /// Collapse an activity's versions into one range per element
    ///
    /// The range runs from the predecessor of the lowest version to the
    /// highest one. Elements seen only as checked out are new and start at
    /// version 0.
    fn sanitize_activity(&self, versions: &[String]) -> Result<Vec<VersionPair>, ScmError> {
        let mut ranges: ByPath<ActivityRange> = ByPath::new();
        let mut ignored = Vec::new();

        for change in versions {
            let Some((path, current)) = change.rsplit_once(special::MAIN_BRANCH) else {
                log::debug!("Ignoring {change}: not on the main branch");
                ignored.push(change.as_str());
                continue;
            };

            let path = path.strip_suffix(special::EXTENDED_SEPARATOR).unwrap_or(path);
            let current = format!("{}{current}", special::MAIN_BRANCH);

            let in_vob = self
                .vob_tags()
                .iter()
                .any(|tag| path.contains(&format!("{tag}/")));
            if !in_vob {
                log::debug!("VOB tag does not match, ignoring changes on {path}");
                ignored.push(change.as_str());
                continue;
            }

            let version = Parser::version_number(&current)?;
            if version == 0 {
                log::warn!(
                    "Unexpected version 0 for {path} in activity changeset. Did you rmver the \
                     first version, or forget to check it in? This file will be ignored."
                );
                ignored.push(change.as_str());
                continue;
            }

            let range = ranges.entry_or_insert_with(path, || ActivityRange {
                highest: version,
                lowest: version,
                current: current.clone(),
            });

            if version > range.highest {
                range.highest = version;
                range.current = current;
            } else if version < range.lowest {
                range.lowest = version;
            }
        }

        if !ignored.is_empty() {
            log::warn!(
                "The following elements from this change set are not part of the configured \
                 VOBs, and will be ignored:\n{}",
                ignored.join("\n")
            );
        }

        let mut pairs = Vec::new();

        for (path, range) in ranges {
            let (branch, _) = Parser::split_version(&range.current);

            let previous = if range.lowest == u64::MAX {
                Parser::join_version(branch, "0")
            } else {
                let (branch, number) = self.predecessor(&path, branch, range.lowest)?;
                Parser::join_version(&branch, &number)
            };

            pairs.push((
                Parser::extended_path(&path, &previous),
                Parser::extended_path(&path, &range.current),
            ));
        }

        Ok(pairs)
    }

    /// Versions that differ between two baselines, or a baseline and its predecessor
    fn baseline_changeset(
        &self,
        base: &str,
        other: Option<&str>,
    ) -> Result<Vec<VersionPair>, ScmError> {
        let base = format!("{}{base}", prefixes::BASELINE);
        let mut args = vec![commands::DIFFBL, flags::VERSION];

        let other = other.map(|other| format!("{}{other}", prefixes::BASELINE));
        match other {
            Some(ref other) => args.extend([base.as_str(), other.as_str()]),
            None => args.extend([flags::PREDECESSOR, base.as_str()]),
        }

        let output = self.run_with(&args, &RunOptions::default().ignoring(&[1, 2]))?;

        let mut described = String::new();
        for version in Parser::parse_diffbl_versions(&output) {
            let info = self.run_with(
                &[
                    commands::DESCRIBE,
                    flags::FMT,
                    formats::VERSION_TRIPLE,
                    &version,
                ],
                &RunOptions::default().ignoring(&[1]),
            )?;
            described.push_str(&info);
        }

        Self::sanitize_branch(Parser::parse_version_triples(&described)?)
    }

    /// Versions created on a branch type in the configured VOBs
    fn branch_changeset(&self, branch: &str) -> Result<Vec<VersionPair>, ScmError> {
        let selector = format!("brtype({branch})");
        let exec = format!(
            "cleartool descr -fmt \"{}\" \"{}\"",
            formats::VERSION_TRIPLE,
            special::FIND_XPN
        );

        let output = self.run_with(
            &[
                commands::FIND,
                flags::ALL_VOBS,
                flags::VERSION,
                &selector,
                flags::EXEC,
                &exec,
            ],
            &self.avobs_options(self.vob_tags()),
        )?;

        Self::sanitize_branch(Parser::parse_version_triples(&output)?)
    }

    /// Keep the base and the highest version of each element on a branch
    fn sanitize_branch(triples: Vec<VersionTriple>) -> Result<Vec<VersionPair>, ScmError> {
        let mut ranges: ByPath<BranchRange> = ByPath::new();

        for triple in triples {
            let version = Parser::version_number(&triple.current)?;

            let range = ranges.entry_or_insert_with(&triple.path, || BranchRange {
                highest: version,
                previous: triple.previous.clone(),
                current: triple.current.clone(),
            });

            if version == 0 {
                // the predecessor of version 0 on a branch is its base
                range.previous = triple.previous;
            } else if version > range.highest {
                range.highest = version;
                range.current = triple.current;
            }
        }

        Ok(ranges
            .into_iter()
            .map(|(path, range)| {
                (
                    Parser::extended_path(&path, &range.previous),
                    Parser::extended_path(&path, &range.current),
                )
            })
            .collect())
    }

    /// Elements whose versions differ between two labels
    ///
    /// A single label is compared against the latest versions.
    fn label_changeset(
        &self,
        base: &str,
        other: Option<&str>,
    ) -> Result<Vec<VersionPair>, ScmError> {
        let labels = [base, other.unwrap_or(special::LATEST)];

        let mut matched_vobs = Vec::new();
        for tag in self.vob_tags() {
            let mut present = true;
            for label in labels {
                if label != special::LATEST && !self.is_a_label(label, Some(tag))? {
                    present = false;
                }
            }
            if present {
                matched_vobs.push(tag.clone());
            }
        }

        if matched_vobs.is_empty() {
            return Err(ScmError::InvalidRevisionSpec(format!(
                "Label {} was not found in any of the configured VOBs",
                labels.join(" or ")
            )));
        }

        let [previous_label, current_label] = labels;
        log::debug!("Comparison between labels {previous_label} and {current_label}");

        let previous = self.label_elements(previous_label, &matched_vobs)?;
        let current = self.label_elements(current_label, &matched_vobs)?;

        let mut pairs = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for path in previous.paths().chain(current.paths()) {
            if !seen.insert(path) {
                continue;
            }

            let old = previous.get(path).map_or(special::MAIN_ZERO, String::as_str);
            let new = current.get(path).map_or(special::MAIN_ZERO, String::as_str);

            log::debug!("path: {path}\nprevious: {old}\ncurrent:  {new}");

            if old == new {
                continue;
            }

            pairs.push((
                Parser::extended_path(path, old),
                Parser::extended_path(path, new),
            ));
        }

        Ok(pairs)
    }

    /// Element path to version for everything carrying `label`
    fn label_elements(
        &self,
        label: &str,
        vob_tags: &[String],
    ) -> Result<ByPath<String>, ScmError> {
        // find does not accept a VOB-qualified label type
        let label = label.rsplit_once('@').map_or(label, |(name, _)| name);

        let output = if label == special::LATEST {
            let exec = format!(
                "cleartool describe -fmt \"%On\t%En\t%Vn\n\" \"{}\"",
                special::FIND_PN
            );
            self.run_with(
                &[commands::FIND, flags::ALL_VOBS, flags::EXEC, &exec],
                &self.avobs_options(vob_tags),
            )?
        } else {
            let selector = format!("lbtype({label})");
            let exec = format!(
                "cleartool describe -fmt \"%On\t%En\t%Vn\n\" \"{}\"",
                special::FIND_XPN
            );
            self.run_with(
                &[
                    commands::FIND,
                    flags::ALL_VOBS,
                    flags::VERSION,
                    &selector,
                    flags::EXEC,
                    &exec,
                ],
                &self.avobs_options(vob_tags),
            )?
        };

        let mut elements = ByPath::new();
        for LabelElement { path, version, .. } in Parser::parse_label_elements(&output)? {
            elements.insert(&path, version);
        }
        Ok(elements)
    }

    /// Versions on the branch guarding a UCM stream
    fn stream_changeset(&self, stream: &str) -> Result<Vec<VersionPair>, ScmError> {
        let selector = format!("{}{stream}", prefixes::STREAM);
        let output = self.run(&[commands::DESCRIBE, flags::LONG, &selector])?;

        match Parser::parse_stream_branch(&output) {
            Some(branch) => self.branch_changeset(&branch),
            None => {
                log::error!("Unable to determine branch name for UCM stream {stream}");
                Ok(Vec::new())
            }
        }
    }

    /// Replace `<branch>/0` versions with their predecessor
    ///
    /// `/main/0` has no predecessor and is kept.
    pub(super) fn sanitize_version_zero(
        &self,
        changeset: Vec<VersionPair>,
    ) -> Result<Vec<VersionPair>, ScmError> {
        let sanitize = |version: String| -> Result<String, ScmError> {
            if version.ends_with(special::MAIN_ZERO) || !version.ends_with("/0") {
                return Ok(version);
            }

            log::debug!("Found file {version} with version 0");
            let sanitized = self.describe(formats::PREDECESSOR_PATH, &version)?;
            log::debug!("Sanitized with predecessor, new file: {sanitized}");
            Ok(sanitized)
        };

        changeset
            .into_iter()
            .map(|(old, new)| Ok((sanitize(old)?, sanitize(new)?)))
            .collect()
    }
}

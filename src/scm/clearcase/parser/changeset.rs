//! Changeset listing parsers (lscheckout, lsactivity, diffbl, find)

use std::sync::LazyLock;

use regex::Regex;

use crate::scm::ScmError;

use super::Parser;

/// Leading whitespace run in a `cleartool diffbl` version line
static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// One `%En\t%PVn\t%Vn` record: element, predecessor version, version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTriple {
    pub path: String,
    pub previous: String,
    pub current: String,
}

/// One `%On\t%En\t%Vn` record from a label listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelElement {
    pub oid: String,
    pub path: String,
    pub version: String,
}

impl Parser {
    /// Parse tab-separated `%En\t%PVn\t%Vn` lines
    pub fn parse_version_triples(output: &str) -> Result<Vec<VersionTriple>, ScmError> {
        let output = output.trim();
        if output.is_empty() {
            return Ok(Vec::new());
        }

        output
            .split('\n')
            .map(|line| match line.split('\t').collect::<Vec<_>>().as_slice() {
                [path, previous, current] => Ok(VersionTriple {
                    path: path.to_string(),
                    previous: previous.to_string(),
                    current: current.trim_end().to_string(),
                }),
                _ => Err(ScmError::ParseError {
                    tool: "cleartool",
                    detail: format!("expected element, predecessor and version in {line:?}"),
                }),
            })
            .collect()
    }

    /// Split `lsactivity -fmt %[versions]Qp` output into version paths
    ///
    /// Every version is double-quoted and they share one line.
    pub fn parse_activity_versions(output: &str) -> Vec<String> {
        output
            .split('"')
            .map(str::trim)
            .filter(|version| !version.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Versions listed by `cleartool diffbl -version`
    ///
    /// Only `<<` and `>>` lines name versions.
    pub fn parse_diffbl_versions(output: &str) -> Vec<String> {
        output
            .lines()
            .filter(|line| line.starts_with(">>") || line.starts_with("<<"))
            .filter_map(|line| WHITESPACE_REGEX.splitn(line.trim(), 2).nth(1))
            .map(str::to_string)
            .collect()
    }

    /// Parse a label element listing
    pub fn parse_label_elements(output: &str) -> Result<Vec<LabelElement>, ScmError> {
        output
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| match line.splitn(3, '\t').collect::<Vec<_>>().as_slice() {
                [oid, path, version] => Ok(LabelElement {
                    oid: oid.to_string(),
                    path: path.to_string(),
                    version: version.trim_end().to_string(),
                }),
                _ => Err(ScmError::ParseError {
                    tool: "cleartool find",
                    detail: format!("expected object ID, element and version in {line:?}"),
                }),
            })
            .collect()
    }
}

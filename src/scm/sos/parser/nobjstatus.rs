//! Object record parser (soscmd nobjstatus)
//!
//! Output layout:
//!
//! ```text
//! !nObjStatus! 1
//! !Record!
//! <path>[/#/<revision>]
//! <status code>
//! <object type>
//! <attribute name>
//! <value length>
//! [<value>]
//! ...
//! ```

use std::collections::BTreeMap;

use crate::model::RevisionValue;
use crate::scm::ScmError;

use super::super::constants::special::{NOBJSTATUS_HEADER, RECORD_MARKER};
use super::{NOBJ_FILENAME_REGEX, Parser};

/// One `soscmd nobjstatus` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NObjRecord {
    /// Path without revision information
    pub filename: String,
    /// Path as printed, including any `/#/<revision>` suffix
    pub full_filename: String,
    pub status: i64,
    pub object_type: i64,
    /// Attribute values; `None` when the value is empty
    pub attributes: BTreeMap<String, Option<RevisionValue>>,
}

impl NObjRecord {
    pub fn attribute(&self, name: &str) -> Option<&RevisionValue> {
        self.attributes.get(name).and_then(Option::as_ref)
    }
}

fn parse_error(detail: impl Into<String>) -> ScmError {
    ScmError::ParseError {
        tool: "soscmd nobjstatus",
        detail: detail.into(),
    }
}

fn line_at<'a>(lines: &[&'a str], i: usize) -> Result<&'a str, ScmError> {
    lines
        .get(i)
        .copied()
        .ok_or_else(|| parse_error(format!("truncated record at line {}", i + 1)))
}

fn number_at(lines: &[&str], i: usize) -> Result<i64, ScmError> {
    let line = line_at(lines, i)?.trim();
    line.parse()
        .map_err(|_| parse_error(format!("expected a number on line {}, got {line:?}", i + 1)))
}

impl Parser {
    /// Parse `soscmd nobjstatus` output
    ///
    /// Output without the expected header yields no records.
    pub fn parse_nobjstatus(output: &str) -> Result<Vec<NObjRecord>, ScmError> {
        let lines: Vec<&str> = output.lines().collect();

        if lines.first().map(|l| l.trim()) != Some(NOBJSTATUS_HEADER) {
            log::debug!("Unexpected nobjstatus output, ignoring it");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut i = 1;

        while i < lines.len() {
            if lines[i].trim().is_empty() {
                i += 1;
                continue;
            }

            if lines[i].trim() != RECORD_MARKER {
                return Err(parse_error(format!(
                    "expected {RECORD_MARKER} on line {}, got {:?}",
                    i + 1,
                    lines[i]
                )));
            }

            let full_filename = line_at(&lines, i + 1)?.trim().to_string();
            let filename = NOBJ_FILENAME_REGEX
                .captures(&full_filename)
                .and_then(|caps| caps.name("filename"))
                .map(|m| m.as_str().to_string())
                .ok_or_else(|| parse_error(format!("invalid path {full_filename:?}")))?;

            let status = number_at(&lines, i + 2)?;
            let object_type = number_at(&lines, i + 3)?;
            i += 4;

            let mut attributes = BTreeMap::new();
            while i < lines.len() && lines[i].trim() != RECORD_MARKER {
                let name = lines[i].trim().to_string();
                let value_len = number_at(&lines, i + 1)?;
                i += 2;

                let value = if value_len > 0 {
                    let value = RevisionValue::parse(line_at(&lines, i)?.trim_end());
                    i += 1;
                    Some(value)
                } else {
                    None
                };
                attributes.insert(name, value);
            }

            records.push(NObjRecord {
                filename,
                full_filename,
                status,
                object_type,
                attributes,
            });
        }

        Ok(records)
    }
}

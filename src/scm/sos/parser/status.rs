//! Status output parser (soscmd status)

use crate::model::{ChangeStatus, ObjectKind};
use crate::scm::ScmError;
use crate::scm::changeset::StatusRecord;

use super::super::constants::special::COMMENT_PREFIX;
use super::Parser;

/// Object states that mean "not managed by SOS"
const UNMANAGED_STATE: u8 = b'?';

/// All object states soscmd reports
const KNOWN_STATES: &[u8] = b"-OWCX?N";

impl Parser {
    /// Parse `soscmd status -f%T\t%S\t%C\t%P` output
    ///
    /// Packages are skipped. Any other unknown type, change status, or a
    /// state that decides the classification but is unknown, fails the
    /// whole listing.
    pub fn parse_status(output: &[u8]) -> Result<Vec<StatusRecord>, ScmError> {
        let mut records = Vec::new();

        for line in output.split(|&b| b == b'\n') {
            if line.starts_with(COMMENT_PREFIX) {
                continue;
            }

            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }

            if let Some(record) = Self::parse_status_line(line)? {
                records.push(record);
            }
        }

        log::debug!("Parsed {} status record(s)", records.len());
        Ok(records)
    }

    /// Parse one tab-separated status line
    pub fn parse_status_line(line: &[u8]) -> Result<Option<StatusRecord>, ScmError> {
        let fields: Vec<&[u8]> = line.splitn(4, |&b| b == b'\t').collect();

        let [obj_type, state, change_status, path] = fields.as_slice() else {
            return Err(ScmError::ParseError {
                tool: "soscmd status",
                detail: format!("expected 4 fields in {:?}", String::from_utf8_lossy(line)),
            });
        };

        let path = String::from_utf8_lossy(path).into_owned();
        let unexpected = |detail: String| ScmError::UnexpectedChange {
            path: path.clone(),
            detail,
        };

        let kind = match *obj_type {
            b"d" | b"D" => ObjectKind::Directory,
            b"f" | b"F" => ObjectKind::File,
            b"s" | b"S" => ObjectKind::Symlink,
            b"p" | b"P" => return Ok(None),
            other => {
                return Err(unexpected(format!(
                    "unknown object type {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        };

        let change_status = match *change_status {
            b"!" => ChangeStatus::Deleted,
            b"M" => ChangeStatus::Modified,
            b"?" => ChangeStatus::NotApplicable,
            b"-" => ChangeStatus::Unchanged,
            other => {
                return Err(unexpected(format!(
                    "unknown change status {:?}",
                    String::from_utf8_lossy(other)
                )));
            }
        };

        let known_state = matches!(*state, [b] if KNOWN_STATES.contains(b));
        if change_status == ChangeStatus::NotApplicable && !known_state {
            return Err(unexpected(format!(
                "unknown object state {:?}",
                String::from_utf8_lossy(state)
            )));
        }

        Ok(Some(StatusRecord {
            path,
            kind,
            managed: *state != [UNMANAGED_STATE],
            change_status,
        }))
    }
}

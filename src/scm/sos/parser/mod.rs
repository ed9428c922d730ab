//! soscmd output parser
//!
//! Parses the output from soscmd commands into structured data.

mod changelist;
mod nobjstatus;
mod status;
mod tree;

pub use nobjstatus::NObjRecord;


use regex::Regex;
use std::sync::LazyLock;

/// Regex for one side of a `soscmd diff <dir>` edit script
/// Format: `<op> <type>:    <name>    <object id>    [comment]`
/// Example: `< F:    oldfile1   1`
///
/// Groups: op (`<` old, `>` new), type (F, L, D, X), name, object id
static TREE_ENTRY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<op>[<>]) (?P<type>[FLDX]):\s{1,4}(?P<name>.+?)\s+(?P<id>\d+)(?:\s+[A-Za-z].*)?\s*$",
    )
    .expect("Invalid tree entry regex")
});

/// Regex for a `soscmd nobjstatus` record path with optional revision
/// Example: `./README/#/3`
static NOBJ_FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<filename>.+?)(?:/#/(?P<revision>\d+))?$")
        .expect("Invalid nobjstatus filename regex")
});

/// Regex for `soscmd version` output
static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^soscmd version (\d+)\.(\d+)").expect("Invalid version regex")
});

/// Separator between RSO names in `soscmd query rso`
static RSO_SPLIT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*").expect("Invalid RSO split regex"));

/// Parser for soscmd output
pub struct Parser;

impl Parser {
    /// Parse `soscmd version` into (major, minor)
    pub fn parse_version(output: &str) -> Option<(u32, u32)> {
        let caps = VERSION_REGEX.captures(output.trim_start())?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        Some((major, minor))
    }

    /// Split `soscmd query rso` output into RSO names
    pub fn parse_rso(value: &str) -> Vec<String> {
        RSO_SPLIT_REGEX
            .split(value.trim())
            .map(str::to_string)
            .collect()
    }

    /// Keep the paths of a `soscmd status -f%P` listing, dropping comments
    pub fn parse_selection(output: &[u8]) -> Vec<u8> {
        use super::constants::special::COMMENT_PREFIX;

        output
            .split_inclusive(|&b| b == b'\n')
            .filter(|line| !line.starts_with(COMMENT_PREFIX))
            .flatten()
            .copied()
            .collect()
    }
}

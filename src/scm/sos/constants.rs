//! SOS-specific constants
//!
//! Centralized definitions for soscmd command names, flags, and special values.

/// soscmd binary name
pub const SOSCMD: &str = "soscmd";

/// First SOS version with changelist support
pub const MIN_CHANGELIST_VERSION: (u32, u32) = (7, 20);

/// Paths passed to one `soscmd nobjstatus` call
pub const NOBJSTATUS_BATCH_SIZE: usize = 25;

/// soscmd subcommands
pub mod commands {
    pub const ADD: &str = "add";
    pub const DELETE: &str = "delete";
    pub const DESCRIBE: &str = "describe";
    pub const DIFF: &str = "diff";
    pub const EXPORTREV: &str = "exportrev";
    pub const NOBJSTATUS: &str = "nobjstatus";
    pub const QUERY: &str = "query";
    pub const SELECT: &str = "select";
    pub const STATUS: &str = "status";
    pub const UNDELETE: &str = "undelete";
    pub const VERSION: &str = "version";
}

/// soscmd flags
pub mod flags {
    /// Tab-separated type, state, change status and path
    ///
    /// soscmd expands the literal `\t` itself.
    pub const STATUS_FORMAT: &str = r"-f%T\t%S\t%C\t%P";
    /// Path-only status, used to snapshot the current selection
    pub const PATH_FORMAT: &str = "-f%P";
    /// Suppress the status header
    pub const NO_HEADER: &str = "-Nhdr";
    /// Unclosed (current) revisions
    pub const UNCLOSED: &str = "-ucl";
    /// Attributes fetched for revision lookups
    pub const REVISION_ATTRIBUTES: [&str; 2] = ["-gaRevision", "-gaRevId"];
    /// Show a changelist instead of adding to it
    pub const SHOW: &str = "-s";
    pub const CHANGELIST: &str = "-c";
    /// Prefix of the exportrev destination flag
    pub const OUT_PREFIX: &str = "-out";
    /// Prefix of the select-from-file flag
    pub const SELECT_FILE_PREFIX: &str = "-sfile";
    /// Clear the selection, then select without recursing
    pub const SELECT_RESET: [&str; 2] = ["-sall", "-sNr"];
}

/// Selections passed to `soscmd status`
pub mod selections {
    /// Checked-out, modified objects
    pub const DEFAULT: &[&str] = &["-scm"];
    /// Everything a changelist may reference
    pub const CHANGELIST: &[&str] = &["-sor", "-scm", "-sunm", "-sne"];
    /// Explicit files and directories, unmanaged objects included
    pub const INCLUDE_FILES: &[&str] = &["-sor", "-sfo", "-sdo", "-sunm"];
}

/// `soscmd query` types
pub mod queries {
    pub const PROJECT: &str = "project";
    pub const RSO: &str = "rso";
    pub const SERVER: &str = "server";
    pub const WA_ROOT: &str = "wa_root";
}

/// Special SOS values
pub mod special {
    /// Prefix of status comment lines
    pub const COMMENT_PREFIX: &[u8] = b"!!";
    /// First line of `soscmd nobjstatus` output
    pub const NOBJSTATUS_HEADER: &str = "!nObjStatus! 1";
    /// Start of each `soscmd nobjstatus` record
    pub const RECORD_MARKER: &str = "!Record!";
    /// Separator between a path and its revision
    pub const REVISION_SEPARATOR: &str = "/#/";
    /// Output file `soscmd diff` leaves in the diffed directory
    pub const DIFF_OUT_FILE: &str = "diff.out";
    /// Prefix of a user-supplied selection revision
    pub const SELECTION_PREFIX: &str = "select:";
    /// Version output prefix (e.g., "soscmd version 7.20")
    pub const VERSION_PREFIX: &str = "soscmd version ";
    /// Workarea metadata database, relative to `<wa_root>/.SOS/.workareadb/<project>`
    pub const WORKAREA_DB: &str = "meta.db";
}

/// User-facing error messages
pub mod errors {
    pub const SELECTION_REQUIRED: &str = "SOS requires a revision argument to be a selection in \
         the form of: \"select:<selection>\". For example: select:-scm";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_format_uses_literal_escape() {
        assert!(flags::STATUS_FORMAT.contains("\\t"));
        assert!(!flags::STATUS_FORMAT.contains('\t'));
    }

    #[test]
    fn test_changelist_selection_includes_unmanaged() {
        assert!(selections::CHANGELIST.contains(&"-sunm"));
        assert!(selections::INCLUDE_FILES.contains(&"-sunm"));
    }
}

//! ClearCase-specific constants
//!
//! cleartool command names, flags, output formats, and special values.

/// cleartool binary name
pub const CLEARTOOL: &str = "cleartool";

/// cleartool subcommands
pub mod commands {
    pub const DESCRIBE: &str = "describe";
    pub const DESC: &str = "desc";
    pub const DIFF: &str = "diff";
    pub const DIFFBL: &str = "diffbl";
    pub const FIND: &str = "find";
    pub const GET: &str = "get";
    pub const HOSTINFO: &str = "hostinfo";
    pub const LS: &str = "ls";
    pub const LSACTIVITY: &str = "lsactivity";
    pub const LSCHECKOUT: &str = "lscheckout";
    pub const LSHISTORY: &str = "lshistory";
    pub const LSVIEW: &str = "lsview";
    pub const PWV: &str = "pwv";
}

/// cleartool flags
pub mod flags {
    pub const SHORT: &str = "-short";
    pub const ROOT: &str = "-root";
    pub const LONG: &str = "-long";
    pub const FMT: &str = "-fmt";
    pub const ALL_VOBS: &str = "-avobs";
    pub const CURRENT_VIEW: &str = "-cview";
    pub const ME: &str = "-me";
    pub const VERSION: &str = "-version";
    pub const PREDECESSOR: &str = "-predecessor";
    pub const EXEC: &str = "-exec";
    pub const SERIAL: &str = "-ser";
    pub const TO: &str = "-to";
    pub const LAST: &str = "-last";
    /// Long `hostinfo` listing
    pub const HOST_DETAILS: &str = "-l";
    /// `lsview` flags listing the view properties
    pub const VIEW_PROPERTIES: [&str; 3] = ["-full", "-properties", "-cview"];
    /// `ls` flags for a bare listing of directory entries
    pub const LIST_NAMES: [&str; 3] = ["-short", "-nxname", "-vob_only"];
}

/// `-fmt` strings
pub mod formats {
    /// Element path, predecessor version, version
    ///
    /// cleartool expands the literal `\t` and `\n` itself.
    pub const CHECKOUT: &str = r"%En\t%PVn\t%Vn\n";
    /// Same fields as [`CHECKOUT`], for `describe` of single versions
    pub const VERSION_TRIPLE: &str = "%En\t%PVn\t%Vn\n";
    pub const ACTIVITY_VERSIONS: &str = "%[versions]Qp";
    pub const PREDECESSOR: &str = "%[version_predecessor]p";
    /// Element path at the predecessor of a version
    pub const PREDECESSOR_PATH: &str = "%En@@%PSn";
    pub const OBJECT_ID: &str = "%On";
    pub const ELEMENT_NAME: &str = "%En";
    pub const VERSION_NAME: &str = "%Vn";
    pub const EXTENDED_NAME: &str = "%Xn";
    pub const OBJECT_KIND: &str = "%m";
}

/// Revision argument prefixes
pub mod prefixes {
    pub const ACTIVITY: &str = "activity:";
    pub const BASELINE: &str = "baseline:";
    pub const BRANCH: &str = "brtype:";
    pub const LABEL: &str = "lbtype:";
    pub const STREAM: &str = "stream:";
    /// Object selector for a VOB
    pub const VOB: &str = "vob:";
    /// The VOB of the current directory
    pub const CURRENT_VOB: &str = "vob:.";
    /// Object selector by object ID
    pub const OID: &str = "oid:";
}

/// Special ClearCase values
pub mod special {
    /// `pwv -short` output outside of a view
    pub const NO_VIEW: &str = "** NONE";
    /// Marker cleartool prints in front of error messages
    pub const ERROR_MARKER: &str = "Error: ";
    /// Separator between an element path and its version
    pub const EXTENDED_SEPARATOR: &str = "@@";
    /// Branch that every element starts on
    pub const MAIN_BRANCH: &str = "/main/";
    /// First version on the main branch
    pub const MAIN_ZERO: &str = "/main/0";
    /// Version name for checked-out versions
    pub const CHECKEDOUT: &str = "CHECKEDOUT";
    /// Pseudo-label for the latest version of every element
    pub const LATEST: &str = "LATEST";
    /// `describe` output for view-private objects
    pub const NOT_A_VOB_OBJECT: &str = "Not a vob object";
    /// Environment variable naming the VOBs `-avobs` covers
    pub const AVOBS_ENV: &str = "CLEARCASE_AVOBS";
    /// Separator for [`AVOBS_ENV`]
    #[cfg(windows)]
    pub const AVOBS_SEPARATOR: &str = ";";
    #[cfg(not(windows))]
    pub const AVOBS_SEPARATOR: &str = ":";
    /// Extended pathname of each match, as seen by `find -exec`
    #[cfg(windows)]
    pub const FIND_XPN: &str = "%CLEARCASE_XPN%";
    #[cfg(not(windows))]
    pub const FIND_XPN: &str = "$CLEARCASE_XPN";
    /// Pathname of each match, as seen by `find -exec`
    #[cfg(windows)]
    pub const FIND_PN: &str = "%CLEARCASE_PN%";
    #[cfg(not(windows))]
    pub const FIND_PN: &str = "$CLEARCASE_PN";
    /// `describe -long stream:` line naming the guarding branch type
    pub const GUARDING_PREFIX: &str = "  Guarding: brtype";
    /// Value of `os.short` in the change metadata
    #[cfg(windows)]
    pub const OS_SHORT: &str = "nt";
    #[cfg(not(windows))]
    pub const OS_SHORT: &str = "posix";
}

/// Keys of `cleartool hostinfo -l` output
pub mod host {
    pub const OPERATING_SYSTEM: &str = "Operating system";
    pub const REGION: &str = "Registry region";
    pub const PRODUCT: &str = "Product";
    pub const PRODUCT_NAME: &str = "Product name";
    pub const PRODUCT_VERSION: &str = "Product version";
}

/// User-facing error messages
pub mod errors {
    pub const NOT_IN_VIEW: &str = "Failed to generate diff: run scmdiff inside a view.";
    pub const UNKNOWN_VOB: &str =
        "Unable to determine the current VOB. Make sure to run scmdiff from within your ClearCase view.";
    pub const UNSUPPORTED_VIEW: &str = "Webviews and automatic views are not currently \
         supported. Only dynamic or snapshot views can be used.";
    pub const UNKNOWN_VIEW_TYPE: &str =
        "Unable to determine the view type. Only dynamic or snapshot views can be used.";
    pub const MULTIPLE_REVISIONS_NEED_DYNAMIC: &str =
        "To generate a diff using multiple revisions, you must use a dynamic view.";
    pub const INCLUDE_UNSUPPORTED: &str = "The ClearCase backend does not currently support the \
         -I/--include parameter. To diff for specific files, pass in \
         file@revision1:file@revision2 pairs as arguments";
}

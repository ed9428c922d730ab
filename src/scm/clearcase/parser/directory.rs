//! Directory version diff parser (cleartool diff -ser)

use std::sync::LazyLock;

use regex::Regex;

use super::Parser;

/// Regex for a section header of a serial directory diff
/// Example: `-----[ renamed to ]-----`
static MODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-----\[ (?P<mode>[\w ]+) \]-----$").expect("Invalid directory diff mode regex")
});

/// Entry names that changed between two directory versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryDiff {
    /// (old name, new name)
    pub renamed: Vec<(String, String)>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
}

impl DirectoryDiff {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.added.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Renamed,
    Added,
    Deleted,
    Other,
}

impl Parser {
    /// Parse `cleartool diff -ser <old-dir> <new-dir>`
    ///
    /// A rename spans three lines: `< old`, `---`, `> new`.
    pub fn parse_directory_diff(output: &str) -> DirectoryDiff {
        let lines: Vec<&str> = output.lines().map(str::trim_end).collect();
        let mut diff = DirectoryDiff::default();
        let mut section = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];
            i += 1;

            if let Some(caps) = MODE_REGEX.captures(line) {
                section = Some(match &caps["mode"] {
                    "renamed to" => Section::Renamed,
                    "added" => Section::Added,
                    "deleted" => Section::Deleted,
                    other => {
                        log::debug!("Ignoring directory diff section {other:?}");
                        Section::Other
                    }
                });
                continue;
            }

            if line.is_empty() {
                continue;
            }

            match section {
                Some(Section::Renamed) => {
                    let new_line = lines.get(i + 1).copied().unwrap_or_default();
                    i += 2;

                    if let (Some(old), Some(new)) =
                        (extract_filename(line), extract_filename(new_line))
                    {
                        diff.renamed.push((old.to_string(), new.to_string()));
                    }
                }
                Some(Section::Added) => {
                    if let Some(name) = extract_filename(line) {
                        diff.added.push(name.to_string());
                    }
                }
                Some(Section::Deleted) => {
                    if let Some(name) = extract_filename(line) {
                        diff.deleted.push(name.to_string());
                    }
                }
                Some(Section::Other) | None => {}
            }
        }

        diff
    }
}

/// Entry name from `< name  --07-28T00:30 user`
///
/// The last two words are the timestamp and the user; names may contain
/// spaces.
fn extract_filename(line: &str) -> Option<&str> {
    let mut rest = line.trim_end();

    for _ in 0..2 {
        let (head, _) = rest.rsplit_once(char::is_whitespace)?;
        rest = head.trim_end();
    }

    let name = rest.strip_prefix("< ").or_else(|| rest.strip_prefix("> "))?;
    Some(name).filter(|name| !name.is_empty())
}

//! Changelist parser (soscmd add -s -c <id>)

use crate::scm::changeset::Changelist;

use super::Parser;

impl Parser {
    /// Parse the `<Action> <path>` lines of a changelist listing
    ///
    /// Unknown actions and malformed lines are logged and skipped.
    pub fn parse_changelist(output: &str) -> Changelist {
        let mut changelist = Changelist::default();

        for line in output.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((action, path)) = line.split_once(' ') else {
                log::warn!("Unexpected line from `soscmd add -s`: {line:?}");
                continue;
            };

            let set = match action {
                "Adding" => &mut changelist.adds,
                "Deleting" => &mut changelist.deletes,
                // Older soscmd_utils betas misspell this one.
                "Modifying" | "Modifing" => &mut changelist.modifications,
                _ => {
                    log::warn!("Unexpected action from `soscmd add -s`: {action:?}");
                    continue;
                }
            };
            set.insert(path.to_string());
        }

        changelist
    }
}

//! Workarea helper for SOS integration tests.
//!
//! Provides a temporary workarea directory with a workarea database and the
//! standard `soscmd` rules every diff run needs.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rusqlite::Connection;
use tempfile::TempDir;

use super::{ScriptedRunner, command_of, output};

pub const TEST_PROJECT: &str = "test-project";
pub const TEST_SERVER: &str = "test-server";
pub const TEST_WORKAREA_ID: i64 = 1234567890;

/// A temporary SOS workarea
///
/// The directory is removed when the Workarea is dropped.
pub struct Workarea {
    dir: TempDir,
}

impl Workarea {
    /// Create a workarea with a `meta.db` holding [`TEST_WORKAREA_ID`]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");

        let db_dir = dir.path().join(".SOS").join(".workareadb").join(TEST_PROJECT);
        fs::create_dir_all(&db_dir).expect("Failed to create workarea database directory");

        let conn = Connection::open(db_dir.join("meta.db")).expect("Failed to open meta.db");
        conn.execute_batch(&format!(
            "CREATE TABLE header (waid INTEGER); INSERT INTO header VALUES ({TEST_WORKAREA_ID});"
        ))
        .expect("Failed to write meta.db");

        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Write a file inside the workarea, creating parent directories
    pub fn write_file(&self, relative: &str, content: &[u8]) {
        write_file(&self.path().join(relative), content);
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }

    /// Script the queries and selection handling every diff run performs
    pub fn script_basics(&self, runner: &Rc<ScriptedRunner>) {
        let root = format!("{}\n", self.path().display());
        runner.on(&["soscmd", "query", "wa_root"], root);
        runner.on(&["soscmd", "query", "project"], format!("{TEST_PROJECT}\n"));
        runner.on(&["soscmd", "query", "server"], format!("{TEST_SERVER}\n"));
        runner.on(&["soscmd", "query", "rso"], "main, test\n");
        runner.on(&["soscmd", "version"], "soscmd version 7.20\n");
        runner.on(
            &["soscmd", "status", "-f%P"],
            "README\nsrc/main.c\ndoc/index.md\n",
        );
        runner.on_prefix(&["soscmd", "select", "-sall", "-sNr"], "");
    }

    /// Script `soscmd status` for the given selection flags
    pub fn script_status(&self, runner: &Rc<ScriptedRunner>, selection: &[&str], lines: &[&str]) {
        let mut command = vec!["soscmd", "status", r"-f%T\t%S\t%C\t%P", "-Nhdr"];
        command.extend_from_slice(selection);
        runner.on(&command, super::lines(lines));
    }

    /// Script `soscmd diff <dir>` with the given entry lines
    pub fn script_diff_tree(&self, runner: &Rc<ScriptedRunner>, dir: &str, entries: &[&str]) {
        let sep = "=".repeat(80);
        let mut report = vec![
            format!("** The differences for '{dir}' have been written to file './diff.out'."),
            sep.clone(),
            format!("Reference:     {dir}"),
            format!("Compare:       {dir}"),
            "< Revision:    1".to_string(),
            "> Revision:    1 [In workarea]".to_string(),
            "Generated at:  2021/08/20 03:25:25".to_string(),
            sep.clone(),
            "2a3".to_string(),
        ];
        report.extend(entries.iter().map(|entry| entry.to_string()));
        report.push(sep);

        let text: Vec<&str> = report.iter().map(String::as_str).collect();
        runner.on(&["soscmd", "diff", dir], super::lines(&text));
    }

    /// Script `soscmd exportrev <path>/#/<rev> -out<dest>` to write `content`
    pub fn script_exportrev(&self, runner: &Rc<ScriptedRunner>, source: &str, content: &[u8]) {
        let source = source.to_string();
        let content = content.to_vec();

        runner.on_match(
            move |invocation| {
                let command = command_of(invocation);
                command.len() == 4
                    && command[..3] == ["soscmd", "exportrev", source.as_str()]
                    && command[3].starts_with("-out")
            },
            move |invocation| {
                let dest = invocation.args[2].trim_start_matches("-out");
                write_file(Path::new(dest), &content);
                output(0, "")
            },
        );
    }

    /// Script `soscmd undelete <dir> <name>` to restore `content`
    pub fn script_undelete(
        &self,
        runner: &Rc<ScriptedRunner>,
        dir: &str,
        name: &str,
        content: &[u8],
    ) {
        let target = self.path().join(dir).join(name);
        let content = content.to_vec();
        runner.on_match(
            {
                let (dir, name) = (dir.to_string(), name.to_string());
                move |invocation| {
                    command_of(invocation) == ["soscmd", "undelete", dir.as_str(), name.as_str()]
                }
            },
            move |_| {
                write_file(&target, &content);
                output(0, "")
            },
        );
    }

    /// Script `soscmd delete <path>` to remove the file again
    pub fn script_delete(&self, runner: &Rc<ScriptedRunner>, path: &str) {
        let target = self.path().join(path);
        let path = path.to_string();
        runner.on_match(
            move |invocation| command_of(invocation) == ["soscmd", "delete", path.as_str()],
            move |_| {
                let _ = fs::remove_file(&target);
                output(0, "")
            },
        );
    }
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, content).expect("Failed to write file");
}

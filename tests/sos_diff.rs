//! SOS backend integration tests
//!
//! Full `diff()` runs against a temporary workarea, with `soscmd` answered
//! by a scripted runner.

mod common;

use std::rc::Rc;

use serde_json::{Map, Value, json};

use common::workarea::{TEST_PROJECT, TEST_SERVER};
use common::{ScriptedRunner, Workarea, lines};
use scmdiff::config::DiffOptions;
use scmdiff::scm::sos::SosClient;
use scmdiff::scm::{Backend, ScmError, ScmKind};

fn open(workarea: &Workarea, runner: &Rc<ScriptedRunner>) -> SosClient {
    workarea.script_basics(runner);
    SosClient::open(&runner.config().cwd(workarea.path())).unwrap()
}

fn nobjstatus(records: &[(&str, &str, &str)]) -> String {
    let mut out = vec!["!nObjStatus! 1".to_string()];
    for (path, revision, rev_id) in records {
        out.push("!Record!".to_string());
        out.push(path.to_string());
        out.extend(["3", "1", "Revision", "1"].map(String::from));
        out.push(revision.to_string());
        out.extend(["RevId", "1"].map(String::from));
        out.push(rev_id.to_string());
    }
    out.iter().map(|line| format!("{line}\n")).collect()
}

fn script_nobjstatus(runner: &Rc<ScriptedRunner>, records: &[(&str, &str, &str)]) {
    let mut command = vec!["soscmd", "nobjstatus", "-ucl", "-gaRevision", "-gaRevId"];
    command.extend(records.iter().map(|(path, _, _)| *path));
    runner.on(&command, nobjstatus(records));
}

fn expected_extra_data(changelist: Option<&str>) -> Map<String, Value> {
    let mut extra = json!({
        "sos_project": TEST_PROJECT,
        "sos_server": TEST_SERVER,
        "sos_workarea": "1234567890",
    });
    if let Some(changelist) = changelist {
        extra["sos_changelist"] = changelist.into();
    }
    match extra {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn assert_diff_eq(actual: &[u8], expected: &[u8]) {
    assert_eq!(
        String::from_utf8_lossy(actual),
        String::from_utf8_lossy(expected)
    );
}

fn diff_default_selection(client: &mut SosClient, options: &DiffOptions) -> scmdiff::scm::DiffOutput {
    let revisions = client.parse_revision_spec(&[]).unwrap();
    client.diff(&revisions, options).unwrap()
}

/// The selection restore must be the last command of every run
fn assert_selection_restored(runner: &ScriptedRunner) {
    let calls = runner.calls();
    let last = calls.last().expect("no commands were run");
    assert!(
        last.starts_with("soscmd select -sall -sNr -sfile"),
        "last command was {last}"
    );
}

// =============================================================================
// Selections
// =============================================================================

#[test]
fn test_diff_with_selection() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("README", b"new line\n");
    workarea.write_file("doc/index.md", b"# new header line\n");

    workarea.script_status(
        &runner,
        &["-scm"],
        &["F\tO\tM\t./README", "F\t-\t-\t./ignore-me", "F\tO\tM\t./doc/index.md"],
    );
    script_nobjstatus(&runner, &[("./README", "1", "5"), ("./doc/index.md", "3", "26")]);
    workarea.script_exportrev(&runner, "./README/#/1", b"old line\n");
    workarea.script_exportrev(&runner, "./doc/index.md/#/3", b"# old header line\n");

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(
        &result.diff,
        include_bytes!("fixtures/sos/selection_modified.diffx"),
    );
    assert_eq!(result.extra_data, Some(expected_extra_data(None)));
    assert_selection_restored(&runner);
    runner.assert_all_scripted();
}

#[test]
fn test_diff_with_selection_added_files() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("newfile1", b"new file!\n");
    workarea.write_file("src/newfile2", b"another new file!\n");

    workarea.script_status(&runner, &["-scm"], &["d\tO\tM\t.", "d\tO\tM\t./src"]);
    workarea.script_diff_tree(&runner, ".", &["> F:    newfile1   1"]);
    workarea.script_diff_tree(&runner, "./src", &["> F:    newfile2   1"]);

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(
        &result.diff,
        include_bytes!("fixtures/sos/selection_added.diffx"),
    );
    assert_eq!(result.extra_data, Some(expected_extra_data(None)));
    runner.assert_all_scripted();
}

#[test]
fn test_diff_with_selection_deleted_files() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.script_status(&runner, &["-scm"], &["d\tO\tM\t.", "d\tO\tM\t./src"]);
    workarea.script_diff_tree(&runner, ".", &["< F:    oldfile1   1"]);
    workarea.script_diff_tree(&runner, "./src", &["< F:    oldfile2   1"]);
    workarea.script_undelete(&runner, ".", "oldfile1", b"old file content\n");
    workarea.script_undelete(&runner, "./src", "oldfile2", b"old file content\n");
    workarea.script_delete(&runner, "./oldfile1");
    workarea.script_delete(&runner, "./src/oldfile2");
    script_nobjstatus(&runner, &[("./oldfile1", "10", "27")]);
    script_nobjstatus(&runner, &[("./src/oldfile2", "7", "9")]);

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(
        &result.diff,
        include_bytes!("fixtures/sos/selection_deleted.diffx"),
    );

    // Undeleted files are deleted again
    assert!(!workarea.exists("oldfile1"));
    assert!(!workarea.exists("src/oldfile2"));

    let calls = runner.calls();
    let undelete = calls
        .iter()
        .position(|call| call == "soscmd undelete . oldfile1")
        .unwrap();
    let redelete = calls
        .iter()
        .position(|call| call == "soscmd delete ./oldfile1")
        .unwrap();
    assert!(undelete < redelete);
    runner.assert_all_scripted();
}

#[test]
fn test_diff_with_selection_renamed_files() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("newfile1", b"new content\n");
    workarea.write_file("src/newfile2", b"unchanged content\n");

    workarea.script_status(&runner, &["-scm"], &["d\tO\tM\t./src", "d\tO\tM\t."]);
    workarea.script_diff_tree(
        &runner,
        "./src",
        &["< F:    oldfile2   2", "---", "> F:    newfile2   2"],
    );
    workarea.script_diff_tree(
        &runner,
        ".",
        &["< F:    oldfile1   1", "---", "> F:    newfile1   1"],
    );
    script_nobjstatus(&runner, &[("./newfile1", "1", "19"), ("./src/newfile2", "2", "21")]);
    workarea.script_exportrev(&runner, "./newfile1/#/1", b"old content\n");
    workarea.script_exportrev(&runner, "./src/newfile2/#/2", b"unchanged content\n");

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(
        &result.diff,
        include_bytes!("fixtures/sos/selection_renamed.diffx"),
    );
    runner.assert_all_scripted();
}

#[test]
fn test_repeated_diff_is_identical() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("newfile1", b"new content\n");
    workarea.write_file("src/main.c", b"new main\n");

    workarea.script_status(
        &runner,
        &["-scm"],
        &["F\tO\tM\t./src/main.c", "d\tO\tM\t.", "d\tO\tM\t./src"],
    );
    workarea.script_diff_tree(
        &runner,
        ".",
        &["< F:    oldfile1   1", "---", "> F:    newfile1   1"],
    );
    workarea.script_diff_tree(&runner, "./src", &["< F:    gone.c   4"]);
    workarea.script_undelete(&runner, "./src", "gone.c", b"gone content\n");
    workarea.script_delete(&runner, "./src/gone.c");
    script_nobjstatus(&runner, &[("./newfile1", "1", "19"), ("./src/main.c", "3", "26")]);
    script_nobjstatus(&runner, &[("./src/gone.c", "4", "30")]);
    workarea.script_exportrev(&runner, "./newfile1/#/1", b"old content\n");
    workarea.script_exportrev(&runner, "./src/main.c/#/3", b"old main\n");

    let first = diff_default_selection(&mut client, &DiffOptions::default());
    let second = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(&first.diff, &second.diff);
    assert_eq!(first.extra_data, second.extra_data);
    assert!(!workarea.exists("src/gone.c"));
    assert_selection_restored(&runner);
    runner.assert_all_scripted();
}

#[test]
fn test_diff_with_selection_and_binary_files() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("test.bin", b"\x00\x01\x02");
    workarea.write_file("images/image.png", b"\x03\x04\x05");

    workarea.script_status(
        &runner,
        &["-scm"],
        &["F\tO\tM\t./test.bin", "F\tO\tM\t./images/image.png"],
    );
    script_nobjstatus(&runner, &[("./images/image.png", "3", "26"), ("./test.bin", "1", "5")]);
    workarea.script_exportrev(&runner, "./test.bin/#/1", b"\x00\x01");
    workarea.script_exportrev(&runner, "./images/image.png/#/3", b"\x00\x03");

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert_diff_eq(
        &result.diff,
        include_bytes!("fixtures/sos/selection_binary.diffx"),
    );
}

#[test]
fn test_diff_with_exclude_patterns() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("README", b"new line\n");
    workarea.write_file("doc/index.md", b"# new header line\n");

    workarea.script_status(
        &runner,
        &["-scm"],
        &["F\tO\tM\t./README", "F\tO\tM\t./doc/index.md"],
    );
    script_nobjstatus(&runner, &[("./README", "1", "5"), ("./doc/index.md", "3", "26")]);
    workarea.script_exportrev(&runner, "./README/#/1", b"old line\n");

    let options = DiffOptions {
        exclude_patterns: vec!["doc/*".to_string()],
        ..DiffOptions::default()
    };
    let result = diff_default_selection(&mut client, &options);
    let text = String::from_utf8(result.diff).unwrap();

    assert!(text.contains("\"path\": \"README\""));
    assert!(!text.contains("doc/index.md"));
}

#[test]
fn test_diff_with_include_files_uses_explicit_selection() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("README", b"new line\n");

    workarea.script_status(
        &runner,
        &["-sor", "-sfo", "-sdo", "-sunm", "README"],
        &["F\tO\tM\t./README"],
    );
    script_nobjstatus(&runner, &[("./README", "1", "5")]);
    workarea.script_exportrev(&runner, "./README/#/1", b"old line\n");

    let options = DiffOptions {
        include_files: vec!["README".to_string()],
        ..DiffOptions::default()
    };
    let result = diff_default_selection(&mut client, &options);

    assert!(!result.is_empty());
    runner.assert_all_scripted();
}

#[test]
fn test_diff_with_empty_selection() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.script_status(&runner, &["-scm"], &["!! Selection is empty"]);

    let result = diff_default_selection(&mut client, &DiffOptions::default());

    assert!(result.is_empty());
    assert_eq!(result.extra_data, None);
    assert_selection_restored(&runner);
}

#[test]
fn test_diff_restores_selection_on_failure() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.script_status(&runner, &["-scm"], &["X\tO\tM\t./weird"]);

    let revisions = client.parse_revision_spec(&[]).unwrap();
    let err = client.diff(&revisions, &DiffOptions::default()).unwrap_err();

    assert!(matches!(err, ScmError::UnexpectedChange { .. }));
    assert_selection_restored(&runner);
}

// =============================================================================
// Changelists
// =============================================================================

#[test]
fn test_diff_with_changelist() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);

    workarea.write_file("README", b"new line\n");
    workarea.write_file("src/main.c", b"new content\n");
    workarea.write_file("newfile", b"new file!\n");
    workarea.write_file("doc/index.md", b"# new header line\n");

    runner.on(
        &["soscmd", "add", "-s", "-c", "my_changelist"],
        lines(&[
            "Modifying ./README",
            "Modifying ./src/main.c",
            "Adding ./newfile",
            "Deleting ./delfile",
        ]),
    );
    workarea.script_status(
        &runner,
        &["-sor", "-scm", "-sunm", "-sne"],
        &[
            "F\tO\tM\t./README",
            "F\tO\tM\t./src/main.c",
            "F\t-\t-\t./ignore-me",
            "F\t?\t?\t./newfile",
            "F\t!\t-\t./delfile",
        ],
    );
    script_nobjstatus(&runner, &[("./README", "1", "5"), ("./src/main.c", "3", "26")]);
    workarea.script_exportrev(&runner, "./README/#/1", b"old line\n");
    workarea.script_exportrev(&runner, "./src/main.c/#/3", b"old content\n");

    let revisions = client
        .parse_revision_spec(&["my_changelist".to_string()])
        .unwrap();
    let result = client.diff(&revisions, &DiffOptions::default()).unwrap();

    assert_diff_eq(&result.diff, include_bytes!("fixtures/sos/changelist.diffx"));
    assert_eq!(
        result.extra_data,
        Some(expected_extra_data(Some("my_changelist")))
    );
    runner.assert_all_scripted();
}

#[test]
fn test_changelist_requires_support() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();

    runner.on(&["soscmd", "version"], "soscmd version 7.10\n");
    runner.on_exit(&["soscmd", "describe"], 1, "");
    let mut client = open(&workarea, &runner);

    let err = client
        .parse_revision_spec(&["123".to_string()])
        .unwrap_err();
    assert!(matches!(err, ScmError::InvalidRevisionSpec(_)));
}

// =============================================================================
// Review request matching
// =============================================================================

fn stored_extra_data(project: &str) -> Map<String, Value> {
    match json!({
        "sos_changelist": "my_changelist",
        "sos_project": project,
        "sos_server": TEST_SERVER,
        "sos_workarea": "1234567890",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn test_tree_matches_review_request() {
    let workarea = Workarea::new();
    let runner = ScriptedRunner::new();
    let mut client = open(&workarea, &runner);
    let revisions = client
        .parse_revision_spec(&["my_changelist".to_string()])
        .unwrap();

    assert_eq!(client.kind(), ScmKind::Sos);
    assert!(
        client
            .tree_matches_review_request(&stored_extra_data(TEST_PROJECT), &revisions)
            .unwrap()
    );
    assert!(
        !client
            .tree_matches_review_request(&stored_extra_data("other_project"), &revisions)
            .unwrap()
    );
    assert!(
        !client
            .tree_matches_review_request(&Map::new(), &revisions)
            .unwrap()
    );
}

#[test]
fn test_open_outside_workarea() {
    let runner = ScriptedRunner::new();
    runner.on_exit(&["soscmd", "query", "wa_root"], 1, "");

    let err = SosClient::open(&runner.config()).unwrap_err();
    assert!(matches!(err, ScmError::NotAWorkspace("SOS")));
}

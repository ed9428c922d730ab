//! Common test utilities for integration tests.
//!
//! Backends are driven through a [`ScriptedRunner`] that answers tool
//! invocations from a list of rules instead of spawning processes.
//!
//! Note: Each integration test file compiles as a separate crate,
//! so not all helpers are used in every test file. We suppress
//! dead_code and unused_imports warnings at the module level.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod workarea;

pub use workarea::Workarea;

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use scmdiff::config::ExecutorConfig;
use scmdiff::scm::{CommandOutput, CommandRunner, Invocation};

/// Exit code reported for invocations no rule matches
pub const UNSCRIPTED_EXIT_CODE: i32 = 99;

type Matcher = Box<dyn Fn(&Invocation) -> bool>;
type Responder = Box<dyn Fn(&Invocation) -> CommandOutput>;

struct Rule {
    matches: Matcher,
    respond: Responder,
}

/// A [`CommandRunner`] answering from scripted rules
///
/// The first matching rule wins. Every invocation is recorded.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Executor configuration running every tool through this runner
    pub fn config(self: &Rc<Self>) -> ExecutorConfig {
        ExecutorConfig::with_runner(self.clone())
    }

    /// Answer `program args...` (exact match) with `stdout`
    pub fn on(&self, command: &[&str], stdout: impl AsRef<[u8]>) {
        self.on_exit(command, 0, stdout);
    }

    /// Answer `program args...` (exact match) with an exit code and stdout
    pub fn on_exit(&self, command: &[&str], exit_code: i32, stdout: impl AsRef<[u8]>) {
        let expected: Vec<String> = command.iter().map(|s| s.to_string()).collect();
        let stdout = stdout.as_ref().to_vec();

        self.on_match(
            move |invocation| command_of(invocation) == expected,
            move |_| output(exit_code, stdout.clone()),
        );
    }

    /// Answer with stdout when the command line starts with `prefix`
    pub fn on_prefix(&self, prefix: &[&str], stdout: impl AsRef<[u8]>) {
        let prefix: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        let stdout = stdout.as_ref().to_vec();

        self.on_match(
            move |invocation| command_of(invocation).starts_with(&prefix),
            move |_| output(0, stdout.clone()),
        );
    }

    /// Add an arbitrary rule
    pub fn on_match(
        &self,
        matches: impl Fn(&Invocation) -> bool + 'static,
        respond: impl Fn(&Invocation) -> CommandOutput + 'static,
    ) {
        self.rules.borrow_mut().push(Rule {
            matches: Box::new(matches),
            respond: Box::new(respond),
        });
    }

    /// Every invocation so far, as `program arg...` strings
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|invocation| command_of(invocation).join(" "))
            .collect()
    }

    /// Recorded invocations
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Invocations no rule answered
    pub fn unscripted(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|invocation| !self.rules.borrow().iter().any(|rule| (rule.matches)(invocation)))
            .map(|invocation| command_of(invocation).join(" "))
            .collect()
    }

    /// Assert that every invocation was scripted
    pub fn assert_all_scripted(&self) {
        let unscripted = self.unscripted();
        assert!(unscripted.is_empty(), "unscripted commands: {unscripted:#?}");
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());

        let rules = self.rules.borrow();
        match rules.iter().find(|rule| (rule.matches)(invocation)) {
            Some(rule) => Ok((rule.respond)(invocation)),
            None => Ok(CommandOutput {
                exit_code: UNSCRIPTED_EXIT_CODE,
                stdout: Vec::new(),
                stderr: format!("unscripted command: {}", invocation.command_line()).into_bytes(),
            }),
        }
    }
}

/// Program followed by its arguments
pub fn command_of(invocation: &Invocation) -> Vec<String> {
    std::iter::once(invocation.program.clone())
        .chain(invocation.args.iter().cloned())
        .collect()
}

pub fn output(exit_code: i32, stdout: impl Into<Vec<u8>>) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: stdout.into(),
        stderr: Vec::new(),
    }
}

/// Join lines, terminating each with a newline
pub fn lines(items: &[&str]) -> String {
    items.iter().map(|line| format!("{line}\n")).collect()
}

/// Split a DiffX document into (header line, payload) sections
///
/// Headers without a `length=` option carry an empty payload.
pub fn diffx_sections(diff: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut sections = Vec::new();
    let mut rest = diff;

    while !rest.is_empty() {
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let header = String::from_utf8_lossy(&rest[..end]).into_owned();
        rest = &rest[(end + 1).min(rest.len())..];

        let length = header
            .split([' ', ','])
            .find_map(|option| option.strip_prefix("length="))
            .map(|value| value.parse::<usize>().expect("invalid length"))
            .unwrap_or(0);

        assert!(length <= rest.len(), "section {header:?} overruns the document");
        sections.push((header, rest[..length].to_vec()));
        rest = &rest[length..];
    }

    sections
}

/// The JSON payloads of every `meta` section, in document order
pub fn diffx_metas(diff: &[u8]) -> Vec<serde_json::Value> {
    diffx_sections(diff)
        .into_iter()
        .filter(|(header, _)| header.contains("meta:"))
        .map(|(_, payload)| serde_json::from_slice(&payload).expect("invalid meta JSON"))
        .collect()
}

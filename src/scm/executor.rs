//! SCM command executor
//!
//! Every backend tool invocation goes through a [`CommandRunner`]. The
//! default [`ProcessRunner`] spawns real processes; tests substitute a
//! scripted runner.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use super::ScmError;

/// One tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, resolved through PATH
    pub program: String,
    pub args: Vec<String>,
    /// Working directory (None = inherit)
    pub cwd: Option<PathBuf>,
    /// Extra environment variables layered over the inherited environment
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Render as a shell-like command line for messages and logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Raw result of an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs tool invocations
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Runs invocations as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(ref cwd) = invocation.cwd {
            cmd.current_dir(cwd);
        }

        cmd.envs(&invocation.env);

        match invocation.timeout {
            None => {
                let output = cmd.stdin(Stdio::null()).output()?;
                Ok(CommandOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: output.stdout,
                    stderr: output.stderr,
                })
            }
            Some(timeout) => {
                let child = cmd
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .spawn()?;
                wait_with_timeout(child, timeout)
            }
        }
    }
}

/// Wait for a child, killing it once `timeout` has elapsed
fn wait_with_timeout(mut child: Child, timeout: Duration) -> io::Result<CommandOutput> {
    // Pipes are drained on their own threads so a chatty child can't block
    // on a full pipe while we poll.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }

        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("command did not finish within {}s", timeout.as_secs()),
            ));
        }

        thread::sleep(Duration::from_millis(10));
    };

    let collect = |handle: Option<thread::JoinHandle<io::Result<Vec<u8>>>>| match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
        None => Ok(Vec::new()),
    };

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: collect(stdout)?,
        stderr: collect(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Per-call execution options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Working directory, overriding the executor default
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: BTreeMap<String, String>,
    /// Non-zero exit codes that are not treated as failures
    pub ignore_exit_codes: Vec<i32>,
    /// Never fail on a non-zero exit code
    pub ignore_errors: bool,
    /// Append stderr to the returned output
    pub with_errors: bool,
}

impl RunOptions {
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    pub fn ignoring(mut self, codes: &[i32]) -> Self {
        self.ignore_exit_codes.extend_from_slice(codes);
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn with_errors(mut self) -> Self {
        self.with_errors = true;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Executor for one SCM tool
///
/// Cheap to clone; clones share the underlying runner.
#[derive(Clone)]
pub struct Executor {
    program: &'static str,
    runner: Rc<dyn CommandRunner>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("program", &self.program)
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Executor {
    pub fn new(program: &'static str, runner: Rc<dyn CommandRunner>) -> Self {
        Self {
            program,
            runner,
            cwd: None,
            timeout: None,
        }
    }

    /// Set the default working directory
    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    /// Default working directory, if any
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Run a command and return its stdout decoded as text
    pub fn run(&self, args: &[&str]) -> Result<String, ScmError> {
        self.run_with(args, &RunOptions::default())
    }

    /// Run a command with options and return its output decoded as text
    pub fn run_with(&self, args: &[&str], options: &RunOptions) -> Result<String, ScmError> {
        let bytes = self.run_bytes(args, options)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Run a command and return its raw stdout
    pub fn run_bytes(&self, args: &[&str], options: &RunOptions) -> Result<Vec<u8>, ScmError> {
        let output = self.execute(args, options)?;
        let mut stdout = output.stdout;

        if options.with_errors {
            stdout.extend_from_slice(&output.stderr);
        }

        Ok(stdout)
    }

    /// Run a command and return the exit code along with decoded stdout
    ///
    /// Never fails on a non-zero exit code.
    pub fn run_status(&self, args: &[&str], options: &RunOptions) -> Result<(i32, String), ScmError> {
        let options = RunOptions {
            ignore_errors: true,
            ..options.clone()
        };
        let output = self.execute(args, &options)?;
        Ok((
            output.exit_code,
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }

    /// Run a command, enforcing the exit code policy
    pub fn execute(&self, args: &[&str], options: &RunOptions) -> Result<CommandOutput, ScmError> {
        let invocation = Invocation {
            program: self.program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            cwd: options.cwd.clone().or_else(|| self.cwd.clone()),
            env: options.env.clone(),
            timeout: self.timeout,
        };

        log::debug!("Running: {}", invocation.command_line());

        let output = self.runner.run(&invocation).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ScmError::ToolNotFound(self.program.to_string()),
            io::ErrorKind::TimedOut => ScmError::Timeout(invocation.command_line()),
            _ => ScmError::IoError(e),
        })?;

        if output.exit_code == 0
            || options.ignore_errors
            || options.ignore_exit_codes.contains(&output.exit_code)
        {
            return Ok(output);
        }

        Err(ScmError::CommandFailed {
            command: invocation.command_line(),
            exit_code: output.exit_code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Split command output into lines, keeping the terminators
pub fn split_lines_bytes(output: &[u8]) -> Vec<&[u8]> {
    output
        .split_inclusive(|&byte| byte == b'\n')
        .collect()
}

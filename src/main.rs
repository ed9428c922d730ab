//! scmdiff - diff generation for SOS and ClearCase workspaces
//!
//! Binary entry point: maps the command line onto the library
//! configuration and writes the diff.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Context, bail};

use scmdiff::config::{ClearCaseOptions, DEFAULT_CONTEXT_LINES, DiffOptions, ExecutorConfig};
use scmdiff::scm::{self, ScmKind};

/// Generate DiffX or unified diffs from SOS and ClearCase workspaces
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// SCM to use (detected from the current directory when omitted)
    #[arg(long)]
    scm: Option<ScmKind>,

    /// Only diff these files
    #[arg(short = 'I', long = "include", value_name = "FILE")]
    include: Vec<String>,

    /// Leave out files matching these glob patterns
    #[arg(short = 'X', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Write legacy unified diffs instead of DiffX (ClearCase)
    #[arg(long)]
    legacy: bool,

    /// VOB to consider; may be repeated (ClearCase)
    #[arg(long = "vob-tag", value_name = "TAG")]
    vob_tags: Vec<String>,

    /// Context lines around each hunk
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CONTEXT_LINES)]
    context: usize,

    /// Timeout for each backend command, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Write the diff to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the review request extra data as JSON on stderr
    #[arg(long)]
    print_extra_data: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Revisions to diff (backend specific)
    revisions: Vec<String>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    run(cli)
}

fn run(cli: Cli) -> color_eyre::Result<()> {
    let config = ExecutorConfig {
        timeout: cli.timeout.map(Duration::from_secs),
        ..ExecutorConfig::default()
    };
    let clearcase = ClearCaseOptions {
        legacy: cli.legacy,
        vob_tags: cli.vob_tags,
    };
    let options = DiffOptions {
        include_files: cli.include,
        exclude_patterns: cli.exclude,
        context_lines: cli.context,
    };

    let mut backend = scm::open_backend(cli.scm, &config, &clearcase)?;
    log::debug!("Using the {} backend", backend.kind());

    let revisions = backend.parse_revision_spec(&cli.revisions)?;
    let output = backend.diff(&revisions, &options)?;

    if output.is_empty() {
        bail!("There don't seem to be any diffs");
    }

    match cli.output {
        Some(ref path) => fs::write(path, &output.diff)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&output.diff)?;
            stdout.flush()?;
        }
    }

    if cli.print_extra_data
        && let Some(ref extra_data) = output.extra_data
    {
        eprintln!("{}", serde_json::to_string_pretty(extra_data)?);
    }

    Ok(())
}

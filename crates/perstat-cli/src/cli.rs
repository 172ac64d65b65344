//! CLI definition and command dispatch for perstat.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches subcommands onto the core pipeline
//! stages. Every subcommand reads revision-document JSONL (stdin or files,
//! plain/gz/bz2) and writes enriched JSONL (stdout or one file per input).

use std::collections::HashSet;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use perstat_core::{
    diff_revisions, drop_diff, drop_text, drop_tokens, engine_from_config, load_diff_config,
    reduce_stats, track_persistence, DiffConfig, DiffEngine, DiffingOptions, StatsOptions,
    TokenFilter, WindowOptions, DEFAULT_MIN_PERSISTED, DEFAULT_REVERT_RADIUS,
    DEFAULT_WINDOW_SIZE,
};
use perstat_utils::Compression;

use crate::jobs::{self, IoSettings, RecordIter, Sink};

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

// ============================================================================
// CLI Definition
// ============================================================================

/// Content persistence statistics for collaboratively edited histories
#[derive(Parser, Debug)]
#[command(name = "perstat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "PERSTAT_VERBOSE")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Shared I/O flags.
#[derive(Args, Debug)]
pub struct IoArgs {
    /// Input files (plain, .gz, or .bz2 JSONL). Reads stdin when omitted.
    pub files: Vec<std::path::PathBuf>,

    /// Write output to this directory, one file per input path
    #[arg(long)]
    pub output: Option<std::path::PathBuf>,

    /// Compression for files written to --output (bz2, gz, none)
    #[arg(long, default_value = "bz2")]
    pub compress: String,

    /// Worker threads when processing multiple input files
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Diff-stage flags.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Path to a diff-engine YAML configuration
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Only process pages in these namespaces (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Option<Vec<i64>>,

    /// Maximum seconds a single diff may run before the trivial
    /// delete-all/insert-all script is recorded instead
    #[arg(long)]
    pub timeout: Option<f64>,
}

/// Persistence-stage flags.
#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Number of later revisions observed per revision
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window: usize,

    /// Maximum revision distance a revert can span
    #[arg(long, default_value_t = DEFAULT_REVERT_RADIUS)]
    pub revert_radius: usize,

    /// Capture instant of the history (RFC 3339); caps visibility for
    /// tokens alive at page end. Defaults to now.
    #[arg(long)]
    pub sunset: Option<String>,
}

/// Stats-stage flags.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Minimum later revisions a token must survive to count as persistent
    #[arg(long, default_value_t = DEFAULT_MIN_PERSISTED)]
    pub min_persisted: usize,

    /// Minimum days a token must stay visible to count as persistent
    #[arg(long, default_value_t = 14.0)]
    pub min_visible: f64,

    /// Only count tokens matching this regex (case insensitive)
    #[arg(long)]
    pub include: Option<String>,

    /// Ignore tokens matching this regex (case insensitive; wins over
    /// --include)
    #[arg(long)]
    pub exclude: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute token-level diffs for a revision-document stream
    #[command(name = "dump2diffs", after_help = r#"EXAMPLES:
    # Diff a revision-document stream from stdin
    perstat dump2diffs < revdocs.json > diffs.json

    # Process dump files in parallel into an output directory
    perstat dump2diffs revdocs-*.json.bz2 --output diffs/ --threads 4

    # Guard against pathological diffs
    perstat dump2diffs revdocs.json --timeout 10
"#)]
    Dump2Diffs {
        #[command(flatten)]
        diff: DiffArgs,

        /// Keep the 'text' field in the output
        #[arg(long)]
        keep_text: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Track token persistence through a window of later revisions
    #[command(name = "diffs2persistence", after_help = r#"EXAMPLES:
    # Add persistence data to diffed documents
    perstat diffs2persistence --sunset 2014-10-01T00:00:00Z < diffs.json

    # Use a small window for quick estimates
    perstat diffs2persistence --window 10 < diffs.json
"#)]
    Diffs2Persistence {
        #[command(flatten)]
        window: WindowArgs,

        /// Keep the 'text' field in the output
        #[arg(long)]
        keep_text: bool,

        /// Keep the 'diff' block in the output
        #[arg(long)]
        keep_diff: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Reduce persistence documents to per-revision statistics
    #[command(name = "persistence2stats", after_help = r#"EXAMPLES:
    # Aggregate with the default thresholds (5 revisions, 14 days)
    perstat persistence2stats < persistence.json

    # Ignore whitespace tokens
    perstat persistence2stats --exclude '^\s+$' < persistence.json
"#)]
    Persistence2Stats {
        #[command(flatten)]
        stats: StatsArgs,

        /// Keep the per-token documents in the output
        #[arg(long)]
        keep_tokens: bool,

        #[command(flatten)]
        io: IoArgs,
    },

    /// Full pipeline: diffs, persistence, and statistics in one pass
    #[command(name = "dump2stats", after_help = r#"EXAMPLES:
    # Everything at once
    perstat dump2stats --sunset 2014-10-01T00:00:00Z < revdocs.json > stats.json
"#)]
    Dump2Stats(FullPipelineArgs),

    /// Full pipeline over pre-extracted revision documents
    #[command(name = "revdocs2stats")]
    Revdocs2Stats(FullPipelineArgs),
}

/// Flags for the single-pass pipeline commands.
#[derive(Args, Debug)]
pub struct FullPipelineArgs {
    #[command(flatten)]
    pub diff: DiffArgs,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub stats: StatsArgs,

    /// Keep the 'text' field in the output
    #[arg(long)]
    pub keep_text: bool,

    /// Keep the 'diff' block in the output
    #[arg(long)]
    pub keep_diff: bool,

    /// Keep the per-token documents in the output
    #[arg(long)]
    pub keep_tokens: bool,

    #[command(flatten)]
    pub io: IoArgs,
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// # Returns
///
/// `ExitCode::SUCCESS` on success (including `--help`/`--version`), and
/// `ExitCode::FAILURE` on usage errors or propagated I/O failures.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    // Logs go to stderr; stdout carries the JSONL stream.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "perstat_core={log},perstat_diff={log},perstat_cli={log}",
        log = log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Dump2Diffs {
            diff,
            keep_text,
            io,
        } => handle_dump2diffs(diff, keep_text, io),
        Command::Diffs2Persistence {
            window,
            keep_text,
            keep_diff,
            io,
        } => handle_diffs2persistence(window, keep_text, keep_diff, io),
        Command::Persistence2Stats {
            stats,
            keep_tokens,
            io,
        } => handle_persistence2stats(stats, keep_tokens, io),
        Command::Dump2Stats(args) | Command::Revdocs2Stats(args) => handle_full_pipeline(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("perstat: {e:#}");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Argument resolution
// ============================================================================

fn io_settings(io: IoArgs) -> anyhow::Result<IoSettings> {
    let compression: Compression = io
        .compress
        .parse()
        .with_context(|| format!("Invalid --compress value `{}`", io.compress))?;
    Ok(IoSettings {
        files: io.files,
        output: io.output,
        compression,
        threads: io.threads,
    })
}

fn load_engine(config: Option<&Path>) -> anyhow::Result<Box<dyn DiffEngine>> {
    let config = match config {
        Some(path) => load_diff_config(path)
            .with_context(|| format!("Failed to load diff config {}", path.display()))?,
        None => DiffConfig::default(),
    };
    Ok(engine_from_config(config))
}

fn diffing_options(args: &DiffArgs) -> DiffingOptions {
    DiffingOptions {
        namespaces: args
            .namespaces
            .as_ref()
            .map(|ids| ids.iter().copied().collect::<HashSet<i64>>()),
        timeout: args.timeout.map(Duration::from_secs_f64),
    }
}

fn window_options(args: &WindowArgs) -> anyhow::Result<WindowOptions> {
    let sunset = args
        .sunset
        .as_deref()
        .map(parse_sunset)
        .transpose()?;
    Ok(WindowOptions {
        window_size: args.window,
        revert_radius: args.revert_radius,
        sunset,
    })
}

fn parse_sunset(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid --sunset timestamp `{raw}` (expected RFC 3339)"))
}

fn stats_options(args: &StatsArgs) -> anyhow::Result<StatsOptions> {
    Ok(StatsOptions {
        min_persisted: args.min_persisted,
        min_visible: args.min_visible * SECONDS_PER_DAY,
        filter: TokenFilter::new(args.include.as_deref(), args.exclude.as_deref())?,
    })
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_dump2diffs(diff: DiffArgs, keep_text: bool, io: IoArgs) -> anyhow::Result<()> {
    let settings = io_settings(io)?;
    let engine = load_engine(diff.config.as_deref())?;
    let options = diffing_options(&diff);

    jobs::run_streams(&settings, |records: RecordIter<'_>, sink: Sink<'_>| {
        let diffed = diff_revisions(records, engine.as_ref(), options.clone());
        let mut out: RecordIter<'_> = if keep_text {
            Box::new(diffed)
        } else {
            Box::new(drop_text(diffed))
        };
        out.try_for_each(|item| sink(&item?))
    })
}

fn handle_diffs2persistence(
    window: WindowArgs,
    keep_text: bool,
    keep_diff: bool,
    io: IoArgs,
) -> anyhow::Result<()> {
    let settings = io_settings(io)?;
    let options = window_options(&window)?;

    jobs::run_streams(&settings, |records: RecordIter<'_>, sink: Sink<'_>| {
        let tracked = track_persistence(records, options.clone());
        let tracked: RecordIter<'_> = if keep_text {
            Box::new(tracked)
        } else {
            Box::new(drop_text(tracked))
        };
        let mut out: RecordIter<'_> = if keep_diff {
            Box::new(tracked)
        } else {
            Box::new(drop_diff(tracked))
        };
        out.try_for_each(|item| sink(&item?))
    })
}

fn handle_persistence2stats(
    stats: StatsArgs,
    keep_tokens: bool,
    io: IoArgs,
) -> anyhow::Result<()> {
    let settings = io_settings(io)?;
    let options = stats_options(&stats)?;

    jobs::run_streams(&settings, |records: RecordIter<'_>, sink: Sink<'_>| {
        let reduced = reduce_stats(records, options.clone());
        let mut out: RecordIter<'_> = if keep_tokens {
            Box::new(reduced)
        } else {
            Box::new(drop_tokens(reduced))
        };
        out.try_for_each(|item| sink(&item?))
    })
}

fn handle_full_pipeline(args: FullPipelineArgs) -> anyhow::Result<()> {
    let settings = io_settings(args.io)?;
    let engine = load_engine(args.diff.config.as_deref())?;
    let diff_options = diffing_options(&args.diff);
    let window_options = window_options(&args.window)?;
    let stats_options = stats_options(&args.stats)?;
    let (keep_text, keep_diff, keep_tokens) = (args.keep_text, args.keep_diff, args.keep_tokens);

    jobs::run_streams(&settings, |records: RecordIter<'_>, sink: Sink<'_>| {
        let diffed = diff_revisions(records, engine.as_ref(), diff_options.clone());
        let diffed: RecordIter<'_> = if keep_text {
            Box::new(diffed)
        } else {
            Box::new(drop_text(diffed))
        };
        let tracked = track_persistence(diffed, window_options.clone());
        let tracked: RecordIter<'_> = if keep_diff {
            Box::new(tracked)
        } else {
            Box::new(drop_diff(tracked))
        };
        let reduced = reduce_stats(tracked, stats_options.clone());
        let mut out: RecordIter<'_> = if keep_tokens {
            Box::new(reduced)
        } else {
            Box::new(drop_tokens(reduced))
        };
        out.try_for_each(|item| sink(&item?))
    })
}

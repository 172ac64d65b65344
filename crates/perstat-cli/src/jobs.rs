//! Input/output plumbing: JSONL streams in, JSONL streams out.
//!
//! A command's core work is expressed as a `process` function from a record
//! iterator to a sink; this module feeds it from stdin or from any number
//! of input files (optionally in parallel) and routes its output to stdout
//! or to one output file per input path.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;

use perstat_core::{PerstatError, RevisionRecord};
use perstat_utils::{files, Compression};

/// A boxed record stream, the unit every pipeline stage consumes.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<RevisionRecord, PerstatError>> + 'a>;

/// Per-record output callback.
pub type Sink<'s> = &'s mut dyn FnMut(&RevisionRecord) -> anyhow::Result<()>;

/// Resolved I/O settings shared by every subcommand.
#[derive(Debug)]
pub struct IoSettings {
    /// Input files; empty means stdin.
    pub files: Vec<PathBuf>,
    /// Output directory (one file per input); `None` means stdout.
    pub output: Option<PathBuf>,
    /// Compression for files written into `output`.
    pub compression: Compression,
    /// Worker threads for multiple input files; `None` lets rayon pick.
    pub threads: Option<usize>,
}

/// Parse a line-oriented reader into normalized revision records.
///
/// Empty lines are skipped; unparseable lines surface as
/// [`PerstatError::MalformedRecord`].
fn records_from<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<RevisionRecord, PerstatError>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(RevisionRecord::from_json_line(&line).map(RevisionRecord::normalize)),
        Err(e) => Some(Err(PerstatError::Io(e))),
    })
}

fn write_stdout(record: &RevisionRecord) -> anyhow::Result<()> {
    let line = record.to_json_line()?;
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    writeln!(lock, "{line}")?;
    Ok(())
}

/// Run `process` over every configured input stream.
///
/// Multiple input files run on a rayon pool sized by `threads`; with an
/// output directory each file writes its own output, otherwise records
/// from all files interleave on stdout (each line written atomically).
pub fn run_streams<F>(settings: &IoSettings, process: F) -> anyhow::Result<()>
where
    F: for<'a> Fn(RecordIter<'a>, Sink<'_>) -> anyhow::Result<()> + Sync,
{
    if settings.files.is_empty() {
        let stdin = io::stdin();
        let records: RecordIter<'_> = Box::new(records_from(stdin.lock()));
        let mut sink = write_stdout;
        return process(records, &mut sink);
    }

    if let Some(dir) = &settings.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let run_file = |path: &PathBuf| -> anyhow::Result<()> {
        process_file(path, settings, &process)
            .with_context(|| format!("Failed while processing {}", path.display()))
    };

    if settings.files.len() == 1 {
        return run_file(&settings.files[0]);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.threads.unwrap_or(0))
        .build()
        .context("Failed to build worker pool")?;
    pool.install(|| settings.files.par_iter().try_for_each(run_file))
}

fn process_file<F>(path: &Path, settings: &IoSettings, process: &F) -> anyhow::Result<()>
where
    F: for<'a> Fn(RecordIter<'a>, Sink<'_>) -> anyhow::Result<()>,
{
    tracing::debug!(path = %path.display(), "processing input");
    let reader = files::reader(path)?;
    let records: RecordIter<'_> = Box::new(records_from(reader));

    match &settings.output {
        Some(dir) => {
            let out_path = files::output_path(path, dir, settings.compression);
            let mut writer = files::writer(&out_path)?;
            let mut sink = |record: &RevisionRecord| -> anyhow::Result<()> {
                let line = record.to_json_line()?;
                writeln!(writer, "{line}")?;
                Ok(())
            };
            process(records, &mut sink)?;
            writer.flush()?;
            Ok(())
        }
        None => {
            let mut sink = write_stdout;
            process(records, &mut sink)
        }
    }
}

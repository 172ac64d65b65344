//! # perstat CLI
//!
//! Command-line interface for the perstat content-persistence pipeline.
//!
//! This binary provides the JSONL stream plumbing around `perstat-core`.
//! Run `perstat --help` for usage information.

mod cli;
mod jobs;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}

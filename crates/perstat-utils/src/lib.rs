//! Utility functions for perstat
//!
//! This crate provides compression-aware readers and writers for the JSONL
//! streams the pipeline consumes and produces. It isolates the compression
//! dependencies (flate2, bzip2) from the core library.

use thiserror::Error;

pub mod files;

pub use files::{output_path, reader, writer, Compression};

#[derive(Debug, Error)]
pub enum UtilsError {
    /// The file extension does not map to a known (de)compression scheme.
    #[error("Extension `{0}` is not supported.")]
    UnsupportedExtension(String),

    /// The requested compression type is unknown.
    #[error("Compression `{0}` is not supported.")]
    UnsupportedCompression(String),

    /// The path exists but is not a regular file.
    #[error("Not a file: {0}")]
    NotAFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for perstat-core.

use thiserror::Error;

/// Domain-specific errors for the persistence pipeline.
#[derive(Error, Debug)]
pub enum PerstatError {
    /// Raw text was submitted to a [`crate::state::DiffState`] built without
    /// a diff engine.
    #[error("Cannot diff raw text: no diff engine was configured.")]
    MissingDiffEngine,

    /// An input record is missing a field the current stage requires, or a
    /// line could not be parsed at all.
    ///
    /// Reverts and diff timeouts are expected paths and never produce this.
    #[error("Malformed revision record: {reason}")]
    MalformedRecord {
        /// Description of what is missing or unparseable.
        reason: String,
    },

    /// An operation document names an operation outside
    /// `equal`/`insert`/`delete`/`replace`.
    #[error("Unknown operation `{0}`.")]
    UnknownOperation(String),

    /// An invalid regular expression was supplied for a token filter.
    #[error("Invalid token filter pattern: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PerstatError {
    /// Shorthand for [`PerstatError::MalformedRecord`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }
}

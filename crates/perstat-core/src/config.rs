//! Diff-engine configuration.
//!
//! The `--config` flag points at a YAML document deserialized into
//! [`DiffConfig`]:
//!
//! ```yaml
//! algorithm: myers        # myers | patience | lcs
//! tokenizer:
//!   paragraph_breaks: true
//!   tag_kinds: true
//! ```
//!
//! Every field is optional; an empty document yields the defaults.

use std::fs::File;
use std::path::Path;

pub use perstat_diff::{DiffConfig, MatcherAlgorithm, TokenizerConfig};

use crate::errors::PerstatError;

/// Load a [`DiffConfig`] from a YAML file.
///
/// # Errors
///
/// Returns [`PerstatError::Io`] when the file cannot be opened and
/// [`PerstatError::Yaml`] when it does not parse.
pub fn load_diff_config(path: &Path) -> Result<DiffConfig, PerstatError> {
    let file = File::open(path)?;
    Ok(serde_yaml::from_reader(file)?)
}

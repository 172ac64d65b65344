//! # perstat-core
//!
//! **perstat** – content persistence analytics for collaboratively edited
//! revision histories.
//!
//! For every token a revision introduces, the pipeline records which later
//! revisions still contain it, then reduces those per-token lifetimes into
//! per-revision statistics. Input and output are chronological,
//! page-partitioned streams of revision documents (one JSON object per
//! line); each stage enriches the stream with one more block:
//!
//! 1. **Diff** ([`diffing`]) – tokenize each revision and record a
//!    token-level edit script against the previous one (`diff`).
//! 2. **Persistence** ([`window`]) – track token survival through a sliding
//!    window of later revisions (`persistence`).
//! 3. **Stats** ([`stats`]) – aggregate survival into per-revision
//!    statistics with filtering and censoring (`persistence` + stats
//!    fields).
//!
//! Pages are processed independently and strictly in revision order; a
//! pipeline instance per page is cheap and holds all of its state, so
//! drivers are free to fan pages out across threads.
//!
//! ## Main Types
//!
//! - [`DiffState`] – per-page incremental token-set maintenance
//! - [`PersistenceWindow`] – the sliding survival buffer
//! - [`RevisionRecord`] – the wire document all stages share
//! - [`PerstatError`] – domain-specific error type
//!
//! ## Example
//!
//! ```ignore
//! use perstat_core::{
//!     diff_adapter::engine_from_config, diffing, stats, window, DiffConfig,
//! };
//!
//! let engine = engine_from_config(DiffConfig::default());
//! let diffed = diffing::diff_revisions(records, engine.as_ref(), Default::default());
//! let tracked = window::track_persistence(diffed, Default::default());
//! let reduced = stats::reduce_stats(tracked, Default::default());
//! for record in reduced {
//!     println!("{}", record?.to_json_line()?);
//! }
//! ```

// Modules
pub mod config;
pub mod diff_adapter;
pub mod diffing;
pub mod engine;
pub mod errors;
pub mod ops;
pub mod records;
pub mod revert;
pub mod slim;
pub mod state;
pub mod stats;
pub mod token;
pub mod window;

// Re-exports for convenience
pub use config::{load_diff_config, DiffConfig, MatcherAlgorithm, TokenizerConfig};
pub use diff_adapter::engine_from_config;
pub use diffing::{diff_revisions, DiffingOptions};
pub use engine::{DiffEngine, DiffProcessor, RawToken};
pub use errors::PerstatError;
pub use ops::{ops_to_docs, OpDoc, OpKind, Operation};
pub use records::{
    DiffRecord, PageRecord, PersistenceBlock, RevisionId, RevisionRecord, TokenDoc, UserKey,
    UserRecord,
};
pub use revert::{Revert, RevertDetector, Version};
pub use slim::{drop_diff, drop_text, drop_tokens};
pub use state::{text_checksum, DiffState, Transition};
pub use stats::{
    reduce_stats, StatsOptions, TokenFilter, DEFAULT_MIN_PERSISTED, DEFAULT_MIN_VISIBLE,
};
pub use token::{Token, TokenArena, TokenId};
pub use window::{
    track_persistence, PersistenceWindow, WindowOptions, DEFAULT_REVERT_RADIUS,
    DEFAULT_WINDOW_SIZE,
};

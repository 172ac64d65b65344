//! # perstat-diff
//!
//! Token-level diff engine for perstat: a tokenizer that partitions revision
//! text into segments, and a sequence matcher that turns two segment
//! sequences into an edit script of `equal`/`insert`/`delete`/`replace`
//! spans.
//!
//! This crate is deliberately free of perstat's domain types; `perstat-core`
//! bridges it into the pipeline through an adapter. Diffing is the CPU-heavy
//! part of the system, which is why it is isolated here.
//!
//! ## Main Types
//!
//! - [`Tokenizer`] – splits text into a partition of [`Segment`]s
//! - [`SegmentMatcher`] – builds stateful [`SegmentProcessor`]s
//! - [`DiffConfig`] – serde configuration for both

pub mod matcher;
pub mod tokenizer;

pub use matcher::{
    DiffConfig, Edit, EditKind, MatcherAlgorithm, SegmentMatcher, SegmentProcessor,
};
pub use tokenizer::{Segment, SegmentKind, Tokenizer, TokenizerConfig};

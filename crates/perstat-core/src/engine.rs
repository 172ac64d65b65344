//! The diff-engine seam.
//!
//! The pipeline consumes diffing through these traits so that the matcher
//! implementation (see `diff_adapter`) stays swappable and the heavy
//! computation stays out of the core. A [`DiffEngine`] is cheap shared
//! configuration; a [`DiffProcessor`] is the per-page stateful worker whose
//! baseline advances with every processed revision.

use crate::ops::Operation;

/// A tokenizer-tagged unit of text, before it is given identity in a
/// [`crate::token::TokenArena`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub text: String,
    pub kind: Option<String>,
}

impl RawToken {
    pub fn new(text: impl Into<String>, kind: Option<String>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Diff engine: tokenizes text and hands out per-page processors.
pub trait DiffEngine: Send + Sync {
    /// Split `text` into a partition of raw tokens.
    fn tokenize(&self, text: &str) -> Vec<RawToken>;

    /// A fresh stateful processor with an empty baseline.
    fn processor(&self) -> Box<dyn DiffProcessor>;
}

/// Stateful per-page diff worker.
///
/// `Send` so that a single diff invocation can be shipped to a worker
/// thread and abandoned on timeout.
pub trait DiffProcessor: Send {
    /// Diff `text` against the baseline and advance the baseline to it.
    ///
    /// Returns `(operations, a, b)`: the edit script plus the previous and
    /// new token sequences its spans index into.
    fn process(&mut self, text: &str) -> (Vec<Operation>, Vec<RawToken>, Vec<RawToken>);

    /// Force the baseline without diffing. Required after a revert (the
    /// baseline becomes the reverted-to tokens) and after an abandoned
    /// diff (the baseline becomes the new text's tokens), so the next
    /// diff runs against the correct base.
    fn update_baseline(&mut self, last_tokens: Vec<RawToken>);

    /// The current baseline tokens.
    fn last_tokens(&self) -> &[RawToken];
}

/// The trivial edit script substituted for an abandoned diff: delete the
/// whole previous sequence, insert the whole new one.
pub fn trivial_operations(a_len: usize, b_len: usize) -> Vec<Operation> {
    use crate::ops::OpKind;

    vec![
        Operation {
            kind: OpKind::Delete,
            a1: 0,
            a2: a_len,
            b1: 0,
            b2: 0,
        },
        Operation {
            kind: OpKind::Insert,
            a1: 0,
            a2: 0,
            b1: 0,
            b2: b_len,
        },
    ]
}

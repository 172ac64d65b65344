//! perstat-diff adapter – bridges the segment matcher into the core
//! diff-engine seam.
//!
//! `perstat-diff` knows nothing about the pipeline's types; this module
//! converts its segments and edit scripts into [`RawToken`]s and
//! [`Operation`]s so `DiffState` and the diff stage can stay
//! implementation-agnostic.

use perstat_diff::{DiffConfig, Edit, EditKind, Segment, SegmentMatcher, SegmentProcessor};

use crate::engine::{DiffEngine, DiffProcessor, RawToken};
use crate::ops::{OpKind, Operation};

/// Build the default engine from a [`DiffConfig`].
pub fn engine_from_config(config: DiffConfig) -> Box<dyn DiffEngine> {
    Box::new(MatcherEngine {
        matcher: SegmentMatcher::new(config),
    })
}

fn raw_from_segment(segment: &Segment) -> RawToken {
    RawToken::new(
        segment.text.clone(),
        segment.kind.map(|k| k.as_str().to_string()),
    )
}

fn segment_from_raw(raw: &RawToken) -> Segment {
    // Kind tags round-trip through their stable names; a foreign tag is
    // dropped rather than guessed.
    let kind = raw.kind.as_deref().and_then(|k| match k {
        "word" => Some(perstat_diff::SegmentKind::Word),
        "number" => Some(perstat_diff::SegmentKind::Number),
        "punct" => Some(perstat_diff::SegmentKind::Punct),
        "whitespace" => Some(perstat_diff::SegmentKind::Whitespace),
        "break" => Some(perstat_diff::SegmentKind::Break),
        _ => None,
    });
    Segment::new(raw.text.clone(), kind)
}

fn operation_from_edit(edit: &Edit) -> Operation {
    Operation {
        kind: match edit.kind {
            EditKind::Equal => OpKind::Equal,
            EditKind::Insert => OpKind::Insert,
            EditKind::Delete => OpKind::Delete,
            EditKind::Replace => OpKind::Replace,
        },
        a1: edit.a1,
        a2: edit.a2,
        b1: edit.b1,
        b2: edit.b2,
    }
}

struct MatcherEngine {
    matcher: SegmentMatcher,
}

impl DiffEngine for MatcherEngine {
    fn tokenize(&self, text: &str) -> Vec<RawToken> {
        self.matcher
            .tokenizer()
            .tokenize(text)
            .iter()
            .map(raw_from_segment)
            .collect()
    }

    fn processor(&self) -> Box<dyn DiffProcessor> {
        Box::new(MatcherProcessor {
            inner: self.matcher.processor(),
            last: Vec::new(),
        })
    }
}

struct MatcherProcessor {
    inner: SegmentProcessor,
    /// Baseline mirrored in core form, so `last_tokens` can hand out a
    /// slice without converting on every call.
    last: Vec<RawToken>,
}

impl DiffProcessor for MatcherProcessor {
    fn process(&mut self, text: &str) -> (Vec<Operation>, Vec<RawToken>, Vec<RawToken>) {
        let (edits, _a, b) = self.inner.process(text);
        let operations = edits.iter().map(operation_from_edit).collect();
        let b_raw: Vec<RawToken> = b.iter().map(raw_from_segment).collect();
        let a_raw = std::mem::replace(&mut self.last, b_raw.clone());
        (operations, a_raw, b_raw)
    }

    fn update_baseline(&mut self, last_tokens: Vec<RawToken>) {
        self.inner
            .set_baseline(last_tokens.iter().map(segment_from_raw).collect());
        self.last = last_tokens;
    }

    fn last_tokens(&self) -> &[RawToken] {
        &self.last
    }
}

// ============================================================================
// Tests
// ============================================================================

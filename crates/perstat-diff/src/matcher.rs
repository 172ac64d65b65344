//! Token-level sequence matching.
//!
//! [`SegmentMatcher`] is the engine: it owns the configuration and hands out
//! stateful [`SegmentProcessor`]s, one per revision history. A processor
//! diffs each new text against the token sequence of the previous one and
//! advances its baseline, so feeding it a page's revisions in order yields
//! the edit script between each consecutive pair.
//!
//! Matching two segments compares text only; a segment's kind tag follows
//! deterministically from its text and never affects the script.

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffOp};

use crate::tokenizer::{Segment, Tokenizer, TokenizerConfig};

// ============================================================================
// Configuration
// ============================================================================

/// Sequence-matching algorithm selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl MatcherAlgorithm {
    fn to_similar(self) -> Algorithm {
        match self {
            Self::Myers => Algorithm::Myers,
            Self::Patience => Algorithm::Patience,
            Self::Lcs => Algorithm::Lcs,
        }
    }
}

/// Engine configuration, loadable from a YAML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    pub algorithm: MatcherAlgorithm,
    pub tokenizer: TokenizerConfig,
}

// ============================================================================
// Edit script
// ============================================================================

/// Kind of an edit-script entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Equal,
    Insert,
    Delete,
    Replace,
}

/// One edit-script entry: spans over the previous (`a`) and new (`b`)
/// segment sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub a1: usize,
    pub a2: usize,
    pub b1: usize,
    pub b2: usize,
}

fn to_edit(op: &DiffOp) -> Edit {
    match *op {
        DiffOp::Equal {
            old_index,
            new_index,
            len,
        } => Edit {
            kind: EditKind::Equal,
            a1: old_index,
            a2: old_index + len,
            b1: new_index,
            b2: new_index + len,
        },
        DiffOp::Delete {
            old_index,
            old_len,
            new_index,
        } => Edit {
            kind: EditKind::Delete,
            a1: old_index,
            a2: old_index + old_len,
            b1: new_index,
            b2: new_index,
        },
        DiffOp::Insert {
            old_index,
            new_index,
            new_len,
        } => Edit {
            kind: EditKind::Insert,
            a1: old_index,
            a2: old_index,
            b1: new_index,
            b2: new_index + new_len,
        },
        DiffOp::Replace {
            old_index,
            old_len,
            new_index,
            new_len,
        } => Edit {
            kind: EditKind::Replace,
            a1: old_index,
            a2: old_index + old_len,
            b1: new_index,
            b2: new_index + new_len,
        },
    }
}

// ============================================================================
// Matcher & processor
// ============================================================================

/// Diff engine: configuration plus a tokenizer.
#[derive(Debug, Clone, Default)]
pub struct SegmentMatcher {
    algorithm: MatcherAlgorithm,
    tokenizer: Tokenizer,
}

impl SegmentMatcher {
    pub fn new(config: DiffConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            tokenizer: Tokenizer::new(config.tokenizer),
        }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// A fresh processor with an empty baseline.
    pub fn processor(&self) -> SegmentProcessor {
        SegmentProcessor {
            algorithm: self.algorithm,
            tokenizer: self.tokenizer.clone(),
            last: Vec::new(),
        }
    }
}

/// Stateful per-history processor.
#[derive(Debug, Clone)]
pub struct SegmentProcessor {
    algorithm: MatcherAlgorithm,
    tokenizer: Tokenizer,
    last: Vec<Segment>,
}

impl SegmentProcessor {
    /// Diff `text` against the baseline and advance the baseline to it.
    ///
    /// Returns the edit script together with the previous (`a`) and new
    /// (`b`) segment sequences the spans index into.
    pub fn process(&mut self, text: &str) -> (Vec<Edit>, Vec<Segment>, Vec<Segment>) {
        let b = self.tokenizer.tokenize(text);

        let old_texts: Vec<&str> = self.last.iter().map(|s| s.text.as_str()).collect();
        let new_texts: Vec<&str> = b.iter().map(|s| s.text.as_str()).collect();
        let edits: Vec<Edit> =
            capture_diff_slices(self.algorithm.to_similar(), &old_texts, &new_texts)
                .iter()
                .map(to_edit)
                .collect();

        let a = std::mem::replace(&mut self.last, b.clone());
        (edits, a, b)
    }

    /// Force the baseline, bypassing a diff. Used after a revert (the
    /// baseline becomes the reverted-to token sequence) or after an
    /// abandoned diff (the baseline becomes the new text's tokens).
    pub fn set_baseline(&mut self, segments: Vec<Segment>) {
        self.last = segments;
    }

    pub fn baseline(&self) -> &[Segment] {
        &self.last
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_first_revision_is_all_insert() {
        let matcher = SegmentMatcher::default();
        let mut processor = matcher.processor();
        let (edits, a, b) = processor.process("Apples are red.");

        assert!(a.is_empty());
        assert_eq!(texts(&b), vec!["Apples", " ", "are", " ", "red", "."]);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind, EditKind::Insert);
        assert_eq!((edits[0].b1, edits[0].b2), (0, b.len()));
    }

    #[test]
    fn test_word_substitution() {
        let matcher = SegmentMatcher::default();
        let mut processor = matcher.processor();
        processor.process("Apples are red.");
        let (edits, a, b) = processor.process("Apples are blue.");

        assert_eq!(a.len(), 6);
        assert_eq!(b.len(), 6);

        // Everything except "red" -> "blue" flows through as equal.
        let equal_a: usize = edits
            .iter()
            .filter(|e| e.kind == EditKind::Equal)
            .map(|e| e.a2 - e.a1)
            .sum();
        assert_eq!(equal_a, 5);

        let changed: Vec<&Edit> = edits
            .iter()
            .filter(|e| e.kind != EditKind::Equal)
            .collect();
        let inserted: Vec<&str> = changed
            .iter()
            .flat_map(|e| b[e.b1..e.b2].iter().map(|s| s.text.as_str()))
            .collect();
        let removed: Vec<&str> = changed
            .iter()
            .flat_map(|e| a[e.a1..e.a2].iter().map(|s| s.text.as_str()))
            .collect();
        assert_eq!(inserted, vec!["blue"]);
        assert_eq!(removed, vec!["red"]);
    }

    #[test]
    fn test_baseline_advances() {
        let matcher = SegmentMatcher::default();
        let mut processor = matcher.processor();
        processor.process("one two");
        let (edits, _, _) = processor.process("one two");
        assert!(edits.iter().all(|e| e.kind == EditKind::Equal));
    }

    #[test]
    fn test_set_baseline() {
        let matcher = SegmentMatcher::default();
        let mut processor = matcher.processor();
        processor.process("something else entirely");

        processor.set_baseline(matcher.tokenizer().tokenize("one two"));
        let (edits, a, _) = processor.process("one two three");
        assert_eq!(texts(&a), vec!["one", " ", "two"]);
        assert!(edits.iter().any(|e| e.kind == EditKind::Equal));
    }

    #[test]
    fn test_spans_cover_both_sequences() {
        let matcher = SegmentMatcher::default();
        let mut processor = matcher.processor();
        processor.process("a b c d");
        let (edits, a, b) = processor.process("a x c");

        let covered_a: usize = edits
            .iter()
            .filter(|e| e.kind != EditKind::Insert)
            .map(|e| e.a2 - e.a1)
            .sum();
        let covered_b: usize = edits
            .iter()
            .filter(|e| e.kind != EditKind::Delete)
            .map(|e| e.b2 - e.b1)
            .sum();
        assert_eq!(covered_a, a.len());
        assert_eq!(covered_b, b.len());
    }

    #[test]
    fn test_algorithm_config_round_trip() {
        let yaml = "algorithm: patience\ntokenizer:\n  paragraph_breaks: false\n";
        let config: DiffConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.algorithm, MatcherAlgorithm::Patience);
        assert!(!config.tokenizer.paragraph_breaks);
    }
}

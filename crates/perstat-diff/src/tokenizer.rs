//! Unicode-aware text segmentation.
//!
//! The tokenizer produces a *partition* of the input: concatenating the
//! segment texts in order reproduces the input exactly. This property is what
//! lets downstream consumers reconstruct revision text from a token list.
//!
//! Segmentation follows Unicode word boundaries, with consecutive
//! whitespace-only boundary segments merged into a single segment so that a
//! paragraph break (two or more newlines) comes out as one unit.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Classify whitespace runs containing two or more newlines as
    /// paragraph breaks (`break`) instead of plain `whitespace`.
    pub paragraph_breaks: bool,
    /// Attach a [`SegmentKind`] tag to each segment.
    pub tag_kinds: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            paragraph_breaks: true,
            tag_kinds: true,
        }
    }
}

/// Coarse class of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Word,
    Number,
    Punct,
    Whitespace,
    Break,
}

impl SegmentKind {
    /// Stable lowercase name, as used in output documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Number => "number",
            Self::Punct => "punct",
            Self::Whitespace => "whitespace",
            Self::Break => "break",
        }
    }
}

/// One unit of a tokenized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub text: String,
    pub kind: Option<SegmentKind>,
}

impl Segment {
    pub fn new(text: impl Into<String>, kind: Option<SegmentKind>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Splits text into a partition of [`Segment`]s.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Tokenize `text` into segments whose concatenation equals `text`.
    pub fn tokenize(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut pending_ws = String::new();

        for piece in text.split_word_bounds() {
            if piece.chars().all(char::is_whitespace) {
                // Word-boundary rules split newline runs into single
                // characters; collect the whole run into one segment.
                pending_ws.push_str(piece);
            } else {
                self.flush_whitespace(&mut pending_ws, &mut segments);
                segments.push(Segment::new(piece, self.classify(piece)));
            }
        }
        self.flush_whitespace(&mut pending_ws, &mut segments);

        segments
    }

    fn flush_whitespace(&self, pending: &mut String, segments: &mut Vec<Segment>) {
        if pending.is_empty() {
            return;
        }
        let kind = if self.config.paragraph_breaks
            && pending.chars().filter(|c| *c == '\n').count() >= 2
        {
            SegmentKind::Break
        } else {
            SegmentKind::Whitespace
        };
        let text = std::mem::take(pending);
        segments.push(Segment::new(text, self.tagged(kind)));
    }

    fn classify(&self, piece: &str) -> Option<SegmentKind> {
        let kind = match piece.chars().next() {
            Some(c) if c.is_numeric() => SegmentKind::Number,
            Some(c) if c.is_alphabetic() => SegmentKind::Word,
            _ => SegmentKind::Punct,
        };
        self.tagged(kind)
    }

    fn tagged(&self, kind: SegmentKind) -> Option<SegmentKind> {
        self.config.tag_kinds.then_some(kind)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn detokenize(segments: &[Segment]) -> String {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_partition_round_trip() {
        let tokenizer = Tokenizer::default();
        for text in [
            "Apples are red.",
            "  leading and trailing  ",
            "line one\n\nline two\n",
            "mixed 42 tokens, with punctuation!",
            "",
            "naïve café, ünïcode",
        ] {
            let segments = tokenizer.tokenize(text);
            assert_eq!(detokenize(&segments), text);
        }
    }

    #[test]
    fn test_sentence_segmentation() {
        let tokenizer = Tokenizer::default();
        let segments = tokenizer.tokenize("Apples are red.");
        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Apples", " ", "are", " ", "red", "."]);
    }

    #[test]
    fn test_kind_classification() {
        let tokenizer = Tokenizer::default();
        let segments = tokenizer.tokenize("word 42 .");
        let kinds: Vec<Option<SegmentKind>> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                Some(SegmentKind::Word),
                Some(SegmentKind::Whitespace),
                Some(SegmentKind::Number),
                Some(SegmentKind::Whitespace),
                Some(SegmentKind::Punct),
            ]
        );
    }

    #[test]
    fn test_paragraph_break() {
        let tokenizer = Tokenizer::default();
        let segments = tokenizer.tokenize("one\n\ntwo");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].kind, Some(SegmentKind::Break));
        assert_eq!(segments[1].text, "\n\n");
    }

    #[test]
    fn test_single_newline_is_whitespace() {
        let tokenizer = Tokenizer::default();
        let segments = tokenizer.tokenize("one\ntwo");
        assert_eq!(segments[1].kind, Some(SegmentKind::Whitespace));
    }

    #[test]
    fn test_breaks_disabled() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            paragraph_breaks: false,
            ..Default::default()
        });
        let segments = tokenizer.tokenize("one\n\ntwo");
        assert_eq!(segments[1].kind, Some(SegmentKind::Whitespace));
    }

    #[test]
    fn test_untagged() {
        let tokenizer = Tokenizer::new(TokenizerConfig {
            tag_kinds: false,
            ..Default::default()
        });
        let segments = tokenizer.tokenize("a b");
        assert!(segments.iter().all(|s| s.kind.is_none()));
    }
}

//! Tokens and the arena that gives them identity.
//!
//! Persistence is tracked per token *instance*, not per token text: two
//! occurrences of the word "the" introduced by different revisions are
//! different tokens with independent lifetimes. Instances live in a
//! [`TokenArena`] owned by the page's diff state, and everything downstream
//! (versions, the revert detector, window entries) refers to them by
//! [`TokenId`]. Sharing an id *is* sharing the instance, which is how a
//! revert re-presents an ancestor's exact tokens.

use crate::records::RevisionId;

/// Handle to a token in a [`TokenArena`].
///
/// Ids are only meaningful within the arena that allocated them; a page
/// pipeline never mixes arenas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u32);

impl TokenId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An atomic unit of text plus the revisions it has been observed in.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    /// Tokenizer tag (`word`, `whitespace`, ...), when the tokenizer
    /// provides one.
    pub kind: Option<String>,
    /// Revision ids this token appeared in, in observation order. A revert
    /// makes these legitimately non-contiguous.
    pub revisions: Vec<RevisionId>,
}

impl Token {
    /// Record an appearance. Callers dedup per revision by instance
    /// identity; see `DiffState`.
    pub fn persist(&mut self, revision: RevisionId) {
        self.revisions.push(revision);
    }
}

/// Owns every token created while processing one page.
#[derive(Debug, Default)]
pub struct TokenArena {
    tokens: Vec<Token>,
}

impl TokenArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token and return its identity handle.
    pub fn alloc(&mut self, text: impl Into<String>, kind: Option<String>) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(Token {
            text: text.into(),
            kind,
            revisions: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    pub fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.index()]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Join token texts in order. For tokenizers that partition their
    /// input, detokenizing a revision's current tokens reproduces its text.
    pub fn detokenize(&self, ids: &[TokenId]) -> String {
        ids.iter().map(|&id| self.get(id).text.as_str()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_get() {
        let mut arena = TokenArena::new();
        let id = arena.alloc("red", Some("word".to_string()));
        assert_eq!(arena.get(id).text, "red");
        assert_eq!(arena.get(id).kind.as_deref(), Some("word"));
        assert!(arena.get(id).revisions.is_empty());
    }

    #[test]
    fn test_identity_is_per_instance() {
        let mut arena = TokenArena::new();
        let a = arena.alloc("the", None);
        let b = arena.alloc("the", None);
        // Same text, different tokens.
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_persist_appends() {
        let mut arena = TokenArena::new();
        let id = arena.alloc("red", None);
        arena.get_mut(id).persist(RevisionId::new(1));
        arena.get_mut(id).persist(RevisionId::new(3));
        let revisions: Vec<i64> = arena.get(id).revisions.iter().map(|r| r.value()).collect();
        assert_eq!(revisions, vec![1, 3]);
    }

    #[test]
    fn test_detokenize() {
        let mut arena = TokenArena::new();
        let ids = vec![
            arena.alloc("Apples", None),
            arena.alloc(" ", None),
            arena.alloc("are", None),
            arena.alloc(" ", None),
            arena.alloc("red", None),
            arena.alloc(".", None),
        ];
        assert_eq!(arena.detokenize(&ids), "Apples are red.");
    }
}

//! Checksum-based revert detection over a bounded revision history.
//!
//! The detector remembers the last `radius` processed versions keyed by
//! content checksum. A new revision whose checksum matches one of them is a
//! revert: it adopts that stored version's exact token instances rather
//! than being diffed.

use std::collections::VecDeque;

use crate::token::TokenId;

/// The full ordered token list of one processed revision.
#[derive(Debug, Clone, Default)]
pub struct Version {
    pub tokens: Vec<TokenId>,
}

impl Version {
    pub fn new(tokens: Vec<TokenId>) -> Self {
        Self { tokens }
    }
}

/// A detected revert.
#[derive(Debug)]
pub struct Revert<'a> {
    /// Checksum shared by the reverting revision and its ancestor.
    pub checksum: &'a str,
    /// The version originally stored under that checksum.
    pub reverted_to: &'a Version,
}

/// Bounded checksum-indexed lookup over recent versions.
#[derive(Debug)]
pub struct RevertDetector {
    radius: usize,
    history: VecDeque<(String, Version)>,
}

impl RevertDetector {
    /// `radius` is the maximum revision distance a revert can span; it is
    /// treated as at least 1.
    pub fn new(radius: usize) -> Self {
        Self {
            radius: radius.max(1),
            history: VecDeque::new(),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Look for `checksum` within the radius. The most recent match wins.
    pub fn check(&self, checksum: &str) -> Option<Revert<'_>> {
        self.history
            .iter()
            .rev()
            .find(|(stored, _)| stored == checksum)
            .map(|(stored, version)| Revert {
                checksum: stored,
                reverted_to: version,
            })
    }

    /// Record the version produced for `checksum`, evicting history beyond
    /// the radius.
    pub fn store(&mut self, checksum: String, version: Version) {
        self.history.push_back((checksum, version));
        while self.history.len() > self.radius {
            self.history.pop_front();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenArena;

    fn version(arena: &mut TokenArena, words: &[&str]) -> Version {
        Version::new(words.iter().map(|w| arena.alloc(*w, None)).collect())
    }

    #[test]
    fn test_detects_within_radius() {
        let mut arena = TokenArena::new();
        let mut detector = RevertDetector::new(3);

        let v1 = version(&mut arena, &["red"]);
        let v1_tokens = v1.tokens.clone();
        detector.store("aaa".to_string(), v1);
        detector.store("bbb".to_string(), version(&mut arena, &["blue"]));

        let revert = detector.check("aaa").expect("revert within radius");
        assert_eq!(revert.checksum, "aaa");
        assert_eq!(revert.reverted_to.tokens, v1_tokens);
        assert!(detector.check("ccc").is_none());
    }

    #[test]
    fn test_radius_eviction() {
        let mut arena = TokenArena::new();
        let mut detector = RevertDetector::new(2);

        detector.store("aaa".to_string(), version(&mut arena, &["one"]));
        detector.store("bbb".to_string(), version(&mut arena, &["two"]));
        detector.store("ccc".to_string(), version(&mut arena, &["three"]));

        // "aaa" fell out of the radius.
        assert!(detector.check("aaa").is_none());
        assert!(detector.check("bbb").is_some());
        assert!(detector.check("ccc").is_some());
    }

    #[test]
    fn test_duplicate_checksum_resolves_to_most_recent() {
        let mut arena = TokenArena::new();
        let mut detector = RevertDetector::new(5);

        detector.store("aaa".to_string(), version(&mut arena, &["old"]));
        let newer = version(&mut arena, &["new"]);
        let newer_tokens = newer.tokens.clone();
        detector.store("aaa".to_string(), newer);

        let revert = detector.check("aaa").unwrap();
        assert_eq!(revert.reverted_to.tokens, newer_tokens);
    }

    #[test]
    fn test_zero_radius_clamped() {
        let detector = RevertDetector::new(0);
        assert_eq!(detector.radius(), 1);
    }
}

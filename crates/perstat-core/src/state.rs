//! Incremental token-set maintenance across a page's revisions.
//!
//! [`DiffState`] is the per-page automaton behind the diff stage of the
//! pipeline: fed revisions in chronological order, it maintains the page's
//! current token instances, creates new ones for inserted content, lets
//! `equal` spans flow instances through untouched, and collapses reverts
//! back to an ancestor's exact token set.

use std::collections::HashSet;

use sha1::{Digest, Sha1};

use crate::engine::{DiffEngine, DiffProcessor, RawToken};
use crate::errors::PerstatError;
use crate::ops::{OpDoc, OpKind, Operation};
use crate::records::RevisionId;
use crate::revert::{RevertDetector, Version};
use crate::token::{TokenArena, TokenId};

/// Hex SHA-1 of a revision's text, the checksum reverts are detected by.
pub fn text_checksum(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// The change one revision makes to the page's token set.
///
/// `added` and `removed` are disjoint by identity; a revert has both empty.
#[derive(Debug, Clone)]
pub struct Transition {
    pub current: Vec<TokenId>,
    pub added: Vec<TokenId>,
    pub removed: Vec<TokenId>,
}

/// Per-page revision state with a diff-based transition function.
pub struct DiffState {
    processor: Option<Box<dyn DiffProcessor>>,
    detector: RevertDetector,
    arena: TokenArena,
    last: Version,
}

impl DiffState {
    /// A state for one page. `diff_engine` is only needed when raw text
    /// will be submitted; precomputed operation documents work without it.
    pub fn new(diff_engine: Option<&dyn DiffEngine>, revert_radius: usize) -> Self {
        Self::with_detector(diff_engine, RevertDetector::new(revert_radius))
    }

    pub fn with_detector(
        diff_engine: Option<&dyn DiffEngine>,
        detector: RevertDetector,
    ) -> Self {
        Self {
            processor: diff_engine.map(|engine| engine.processor()),
            detector,
            arena: TokenArena::new(),
            last: Version::default(),
        }
    }

    /// The arena owning every token this state has created.
    pub fn arena(&self) -> &TokenArena {
        &self.arena
    }

    /// Process a revision given its raw text.
    ///
    /// # Errors
    ///
    /// [`PerstatError::MissingDiffEngine`] when the state was built without
    /// a diff engine.
    pub fn update_text(
        &mut self,
        text: &str,
        revision: RevisionId,
    ) -> Result<Transition, PerstatError> {
        let checksum = text_checksum(text);

        if let Some(transition) = self.try_revert(&checksum) {
            return Ok(self.finish(checksum, transition, revision));
        }

        let processor = self
            .processor
            .as_mut()
            .ok_or(PerstatError::MissingDiffEngine)?;
        let (operations, _a, b) = processor.process(text);
        let transition = apply_operations(&operations, &self.last.tokens, &b, &mut self.arena)?;
        Ok(self.finish(checksum, transition, revision))
    }

    /// Process a revision given its checksum and a precomputed edit script.
    pub fn update_opdocs(
        &mut self,
        checksum: &str,
        opdocs: &[OpDoc],
        revision: RevisionId,
    ) -> Result<Transition, PerstatError> {
        if let Some(transition) = self.try_revert(checksum) {
            return Ok(self.finish(checksum.to_string(), transition, revision));
        }

        let transition = apply_opdocs(opdocs, &self.last.tokens, &mut self.arena)?;
        Ok(self.finish(checksum.to_string(), transition, revision))
    }

    /// Revert branch: adopt the stored ancestor version's token instances
    /// and rebaseline the diff processor on them.
    fn try_revert(&mut self, checksum: &str) -> Option<Transition> {
        let tokens = self
            .detector
            .check(checksum)
            .map(|revert| revert.reverted_to.tokens.clone())?;

        tracing::debug!(checksum, "revert detected; adopting ancestor token set");

        if let Some(processor) = self.processor.as_mut() {
            let raw: Vec<RawToken> = tokens
                .iter()
                .map(|&id| {
                    let token = self.arena.get(id);
                    RawToken::new(token.text.clone(), token.kind.clone())
                })
                .collect();
            processor.update_baseline(raw);
        }

        Some(Transition {
            current: tokens,
            added: Vec::new(),
            removed: Vec::new(),
        })
    }

    /// Record persistence, store the version for revert detection, and
    /// advance the baseline version.
    fn finish(
        &mut self,
        checksum: String,
        transition: Transition,
        revision: RevisionId,
    ) -> Transition {
        // Some diff algorithms copy a source token into several equal
        // spans; the identity-keyed set makes each instance persist a
        // revision at most once.
        let mut seen: HashSet<TokenId> = HashSet::with_capacity(transition.current.len());
        for &id in &transition.current {
            if seen.insert(id) {
                self.arena.get_mut(id).persist(revision);
            }
        }

        self.detector
            .store(checksum, Version::new(transition.current.clone()));
        self.last = Version::new(transition.current.clone());
        transition
    }
}

// ============================================================================
// Operation application
// ============================================================================

fn check_span(name: &str, from: usize, to: usize, len: usize) -> Result<(), PerstatError> {
    if from > to || to > len {
        return Err(PerstatError::malformed(format!(
            "`{name}` span {from}..{to} out of bounds for sequence of length {len}"
        )));
    }
    Ok(())
}

/// Apply an engine-produced edit script: `b`-side tokens of insert/replace
/// spans are given identity; `equal` spans flow previous instances through.
fn apply_operations(
    operations: &[Operation],
    a: &[TokenId],
    b: &[RawToken],
    arena: &mut TokenArena,
) -> Result<Transition, PerstatError> {
    let mut current = Vec::new();
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for op in operations {
        let name = op.kind.as_str();

        if op.kind.inserts() {
            check_span(name, op.b1, op.b2, b.len())?;
            for raw in &b[op.b1..op.b2] {
                let id = arena.alloc(raw.text.clone(), raw.kind.clone());
                current.push(id);
                added.push(id);
            }
        }

        if op.kind.deletes() {
            check_span(name, op.a1, op.a2, a.len())?;
            removed.extend_from_slice(&a[op.a1..op.a2]);
        } else if op.kind == OpKind::Equal {
            check_span(name, op.a1, op.a2, a.len())?;
            current.extend_from_slice(&a[op.a1..op.a2]);
        }
    }

    Ok(Transition {
        current,
        added,
        removed,
    })
}

/// Apply a precomputed operation-document script. Inserted content comes
/// from the documents' carried tokens; spans over the previous sequence
/// select the instances to flow through or remove.
fn apply_opdocs(
    opdocs: &[OpDoc],
    a: &[TokenId],
    arena: &mut TokenArena,
) -> Result<Transition, PerstatError> {
    let mut current = Vec::new();
    let mut added = Vec::new();
    let mut removed = Vec::new();

    for doc in opdocs {
        let kind = doc.kind()?;

        if kind.inserts() {
            let tokens = doc.tokens.as_ref().ok_or_else(|| {
                PerstatError::malformed(format!("`{}` operation without tokens", doc.name))
            })?;
            for text in tokens {
                let id = arena.alloc(text.clone(), None);
                current.push(id);
                added.push(id);
            }
        }

        if kind.deletes() {
            check_span(&doc.name, doc.a1, doc.a2, a.len())?;
            removed.extend_from_slice(&a[doc.a1..doc.a2]);
        } else if kind == OpKind::Equal {
            check_span(&doc.name, doc.a1, doc.a2, a.len())?;
            current.extend_from_slice(&a[doc.a1..doc.a2]);
        }
    }

    Ok(Transition {
        current,
        added,
        removed,
    })
}

// ============================================================================
// Tests
// ============================================================================

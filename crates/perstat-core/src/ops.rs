//! Edit-script operations and their wire form.
//!
//! An [`Operation`] carries spans `(a1, a2, b1, b2)` over the previous and
//! new token sequences. The wire form, [`OpDoc`], additionally carries the
//! content tokens an operation moves: the inserted tokens for
//! `insert`/`replace`, the removed tokens for `delete` (a `replace`
//! document carries the inserted side; the removed side is recovered from
//! its `a` span over the previous sequence).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::RawToken;
use crate::errors::PerstatError;

// ============================================================================
// OpKind
// ============================================================================

/// The four edit-script operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Equal,
    Insert,
    Delete,
    Replace,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }

    /// True when the operation contributes tokens to the new revision.
    pub fn inserts(self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }

    /// True when the operation removes tokens from the previous revision.
    pub fn deletes(self) -> bool {
        matches!(self, Self::Delete | Self::Replace)
    }
}

impl FromStr for OpKind {
    type Err = PerstatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(Self::Equal),
            "insert" => Ok(Self::Insert),
            "delete" => Ok(Self::Delete),
            "replace" => Ok(Self::Replace),
            other => Err(PerstatError::UnknownOperation(other.to_string())),
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Operation
// ============================================================================

/// One edit-script entry over token sequences `a` (previous) and `b` (new).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub a1: usize,
    pub a2: usize,
    pub b1: usize,
    pub b2: usize,
}

// ============================================================================
// OpDoc
// ============================================================================

/// JSON operation document.
///
/// `name` is kept as a string so that an out-of-vocabulary operation
/// surfaces as [`PerstatError::UnknownOperation`] at application time
/// rather than a generic parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDoc {
    pub name: String,
    pub a1: usize,
    pub a2: usize,
    pub b1: usize,
    pub b2: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
}

impl OpDoc {
    pub fn kind(&self) -> Result<OpKind, PerstatError> {
        self.name.parse()
    }
}

/// Render an edit script as wire documents, attaching the content tokens
/// each operation moves.
pub fn ops_to_docs(operations: &[Operation], a: &[RawToken], b: &[RawToken]) -> Vec<OpDoc> {
    operations
        .iter()
        .map(|op| {
            let tokens = if op.kind.inserts() {
                Some(b[op.b1..op.b2].iter().map(|t| t.text.clone()).collect())
            } else if op.kind.deletes() {
                Some(a[op.a1..op.a2].iter().map(|t| t.text.clone()).collect())
            } else {
                None
            };
            OpDoc {
                name: op.kind.as_str().to_string(),
                a1: op.a1,
                a2: op.a2,
                b1: op.b1,
                b2: op.b2,
                tokens,
            }
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

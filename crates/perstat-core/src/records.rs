//! Wire records for the revision-document streams.
//!
//! Every pipeline stage consumes and produces one JSON document per line;
//! the structures here model the fields the pipeline reads or writes, and
//! everything else rides along untouched in [`RevisionRecord::extra`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PerstatError;
use crate::ops::OpDoc;

// ============================================================================
// RevisionId
// ============================================================================

/// A unique identifier for a revision within its history.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RevisionId(i64);

impl RevisionId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for RevisionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Timestamp format
// ============================================================================

/// Serde codec for `YYYY-MM-DDTHH:MM:SSZ` timestamps.
///
/// Reading accepts any RFC 3339 offset; writing always renders second
/// precision in UTC with a `Z` suffix.
pub mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Record components
// ============================================================================

/// The author of a revision: a registered account id and/or a user text
/// (the IP for anonymous edits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Identity key for same-author comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Id(i64),
    Name(String),
}

impl UserRecord {
    /// Registered id when present, user text otherwise. `None` when the
    /// record carries neither; such a revision is never anyone's "self".
    pub fn key(&self) -> Option<UserKey> {
        match (self.id, &self.text) {
            (Some(id), _) => Some(UserKey::Id(id)),
            (None, Some(text)) => Some(UserKey::Name(text.clone())),
            (None, None) => None,
        }
    }
}

/// The page a revision belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: i64,
    pub title: String,
    pub namespace: i64,
}

/// The diff block attached by the diff stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    /// Id of the revision this diff was computed against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<RevisionId>,
    pub ops: Vec<OpDoc>,
    /// Present iff a diff timeout was configured; true when the trivial
    /// substitute script was recorded instead of a real diff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timedout: Option<bool>,
    /// Wall-clock diff duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

/// Per-token survival counters, as serialized in the persistence block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDoc {
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub persisted: usize,
    pub non_self_persisted: usize,
    pub seconds_visible: f64,
}

/// The persistence block: window output, later merged with reducer stats.
///
/// The stats fields stay `None` (and off the wire) until the stats stage
/// fills them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PersistenceBlock {
    pub revisions_processed: usize,
    pub non_self_processed: usize,
    pub seconds_possible: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<TokenDoc>>,

    // Stats-stage fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_added: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_self_persistent_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_log_persisted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_log_non_self_persisted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum_log_seconds_visible: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub censored: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_self_censored: Option<bool>,

    /// Observation cut short by end of history (window flushed before the
    /// entry aged out naturally). Window-internal state; the stats stage
    /// derives the serialized censoring flags itself.
    #[serde(skip)]
    pub truncated: bool,
}

// ============================================================================
// RevisionRecord
// ============================================================================

/// One revision document, as read from and written to the JSONL streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub id: RevisionId,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRecord>,
    pub page: PageRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceBlock>,
    /// Fields the pipeline does not model pass through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RevisionRecord {
    /// Parse one JSONL line.
    pub fn from_json_line(line: &str) -> Result<Self, PerstatError> {
        serde_json::from_str(line).map_err(|e| PerstatError::malformed(e.to_string()))
    }

    /// Serialize to one JSONL line (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, PerstatError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rewrite a MediaWiki-style `contributor` block into the `user` form.
    pub fn normalize(mut self) -> Self {
        if let Some(contributor) = self.extra.remove("contributor") {
            let mut user = UserRecord::default();
            if let Some(obj) = contributor.as_object() {
                user.id = obj.get("id").and_then(|v| v.as_i64());
                user.text = obj
                    .get("user_text")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
            }
            self.user = Some(user);
        }
        self
    }

    /// The author's identity key, if the record names one.
    pub fn user_key(&self) -> Option<UserKey> {
        self.user.as_ref().and_then(UserRecord::key)
    }
}

// ============================================================================
// Tests
// ============================================================================

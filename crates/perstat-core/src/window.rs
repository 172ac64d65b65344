//! Sliding persistence window.
//!
//! Each revision enters the window when it is processed and leaves it once
//! `window_size` later revisions have been observed (or the page ends).
//! While buffered, an entry accumulates survival counters for the tokens it
//! introduced; on exit it is finalized into the record's `persistence`
//! block. Entries flushed by end-of-page are marked truncated: their
//! observation was cut short, so the counts are lower bounds.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::errors::PerstatError;
use crate::records::{PersistenceBlock, RevisionRecord, TokenDoc, UserKey};
use crate::state::{text_checksum, DiffState, Transition};
use crate::token::{TokenArena, TokenId};

/// Default number of later revisions observed per entry.
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Default maximum revision distance a revert can span.
pub const DEFAULT_REVERT_RADIUS: usize = 15;

/// Options for the persistence stage.
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub window_size: usize,
    pub revert_radius: usize,
    /// The instant the history was captured; caps visibility for tokens
    /// still alive at page end. Defaults to the stage's construction time.
    pub sunset: Option<DateTime<Utc>>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            revert_radius: DEFAULT_REVERT_RADIUS,
            sunset: None,
        }
    }
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let seconds = (later - earlier).num_milliseconds() as f64 / 1000.0;
    if seconds < 0.0 {
        tracing::warn!(%earlier, %later, "negative duration clamped to zero");
        0.0
    } else {
        seconds
    }
}

fn same_user(a: Option<&UserKey>, b: Option<&UserKey>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ============================================================================
// WindowEntry
// ============================================================================

/// Survival counters for one token introduced by the entry's revision.
#[derive(Debug)]
struct TokenWatch {
    id: TokenId,
    persisted: usize,
    non_self_persisted: usize,
    seconds_visible: f64,
    /// Visibility accrues only while the token has been continuously
    /// present. Once it disappears the clock stays stopped, even if a
    /// revert re-presents the same instance later; `persisted` keeps
    /// counting presences either way.
    alive: bool,
}

/// One buffered revision.
#[derive(Debug)]
struct WindowEntry {
    record: RevisionRecord,
    timestamp: DateTime<Utc>,
    user: Option<UserKey>,
    watches: Vec<TokenWatch>,
    /// The revision's full token list, kept for debugging and invariant
    /// checks; survival updates only consult the incoming revision's set.
    #[allow(dead_code)]
    current: Vec<TokenId>,
    revisions_processed: usize,
    non_self_processed: usize,
    seconds_possible: f64,
}

impl WindowEntry {
    fn new(record: RevisionRecord, user: Option<UserKey>, transition: &Transition) -> Self {
        let timestamp = record.timestamp;
        let watches = transition
            .added
            .iter()
            .map(|&id| TokenWatch {
                id,
                persisted: 0,
                non_self_persisted: 0,
                seconds_visible: 0.0,
                alive: true,
            })
            .collect();
        Self {
            record,
            timestamp,
            user,
            watches,
            current: transition.current.clone(),
            revisions_processed: 0,
            non_self_processed: 0,
            seconds_possible: 0.0,
        }
    }

    /// Fold one later revision into the counters.
    fn observe(
        &mut self,
        now: DateTime<Utc>,
        user: Option<&UserKey>,
        current: &HashSet<TokenId>,
    ) {
        let self_edit = same_user(self.user.as_ref(), user);

        self.revisions_processed += 1;
        if !self_edit {
            self.non_self_processed += 1;
        }
        self.seconds_possible = seconds_between(self.timestamp, now);

        for watch in &mut self.watches {
            if current.contains(&watch.id) {
                watch.persisted += 1;
                if !self_edit {
                    watch.non_self_persisted += 1;
                }
                if watch.alive {
                    watch.seconds_visible = seconds_between(self.timestamp, now);
                }
            } else {
                watch.alive = false;
            }
        }
    }

    /// Close the entry out into its record's persistence block.
    ///
    /// At a sunset flush, a token that never disappeared was visible right
    /// up to the capture instant, so its visibility extends to the sunset;
    /// a token that died keeps its frozen clock.
    fn finalize(
        mut self,
        truncated: bool,
        sunset: Option<DateTime<Utc>>,
        arena: &TokenArena,
    ) -> RevisionRecord {
        if let Some(sunset) = sunset {
            self.seconds_possible = seconds_between(self.timestamp, sunset);
            for watch in &mut self.watches {
                if watch.alive {
                    watch.seconds_visible =
                        watch.seconds_visible.max(self.seconds_possible);
                }
            }
        }

        let tokens = self
            .watches
            .iter()
            .map(|watch| {
                let token = arena.get(watch.id);
                TokenDoc {
                    text: token.text.clone(),
                    kind: token.kind.clone(),
                    persisted: watch.persisted,
                    non_self_persisted: watch.non_self_persisted,
                    seconds_visible: watch.seconds_visible,
                }
            })
            .collect();

        self.record.persistence = Some(PersistenceBlock {
            revisions_processed: self.revisions_processed,
            non_self_processed: self.non_self_processed,
            seconds_possible: self.seconds_possible,
            tokens: Some(tokens),
            truncated,
            ..Default::default()
        });
        self.record
    }
}

// ============================================================================
// PersistenceWindow
// ============================================================================

/// The sliding buffer itself. One instance per page.
#[derive(Debug)]
pub struct PersistenceWindow {
    size: usize,
    entries: VecDeque<WindowEntry>,
}

impl PersistenceWindow {
    pub fn new(window_size: usize) -> Self {
        Self {
            size: window_size.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Admit a processed revision. Every buffered entry observes it first;
    /// if the buffer then exceeds the window size, the oldest entry ages
    /// out and its finalized record is returned.
    pub fn push(
        &mut self,
        record: RevisionRecord,
        transition: &Transition,
        arena: &TokenArena,
    ) -> Option<RevisionRecord> {
        let timestamp = record.timestamp;
        let user = record.user_key();
        let current: HashSet<TokenId> = transition.current.iter().copied().collect();

        for entry in &mut self.entries {
            entry.observe(timestamp, user.as_ref(), &current);
        }

        self.entries
            .push_back(WindowEntry::new(record, user, transition));

        if self.entries.len() > self.size {
            let oldest = self.entries.pop_front()?;
            return Some(oldest.finalize(false, None, arena));
        }
        None
    }

    /// End-of-page flush: close out every remaining entry, truncated, with
    /// `seconds_possible` measured against the sunset.
    pub fn flush(&mut self, sunset: DateTime<Utc>, arena: &TokenArena) -> Vec<RevisionRecord> {
        let mut flushed = Vec::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop_front() {
            flushed.push(entry.finalize(true, Some(sunset), arena));
        }
        flushed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Persistence stage
// ============================================================================

struct PageState {
    state: DiffState,
    window: PersistenceWindow,
}

impl PageState {
    fn new(options: &WindowOptions) -> Self {
        Self {
            state: DiffState::new(None, options.revert_radius),
            window: PersistenceWindow::new(options.window_size),
        }
    }

    fn process(&mut self, record: RevisionRecord) -> Result<Option<RevisionRecord>, PerstatError> {
        let diff = record.diff.as_ref().ok_or_else(|| {
            PerstatError::malformed(format!("revision {} has no diff ops", record.id))
        })?;
        let checksum = match (&record.sha1, &record.text) {
            (Some(sha1), _) => sha1.clone(),
            (None, Some(text)) => text_checksum(text),
            (None, None) => {
                return Err(PerstatError::malformed(format!(
                    "revision {} has neither sha1 nor text",
                    record.id
                )))
            }
        };

        let transition = self.state.update_opdocs(&checksum, &diff.ops, record.id)?;
        Ok(self.window.push(record, &transition, self.state.arena()))
    }

    fn flush(&mut self, sunset: DateTime<Utc>) -> Vec<RevisionRecord> {
        self.window.flush(sunset, self.state.arena())
    }
}

/// Run the persistence stage over a page-partitioned record stream.
///
/// Records must carry `diff.ops` (the diff stage's output) and arrive in
/// chronological order within each page. Output records are enriched with
/// the `persistence` block and emitted in input order.
pub fn track_persistence<I>(records: I, options: WindowOptions) -> PersistenceStream<I::IntoIter>
where
    I: IntoIterator<Item = Result<RevisionRecord, PerstatError>>,
{
    let sunset = options.sunset.unwrap_or_else(Utc::now);
    PersistenceStream {
        input: records.into_iter(),
        options,
        sunset,
        page: None,
        page_id: None,
        pending: VecDeque::new(),
        exhausted: false,
    }
}

/// Iterator returned by [`track_persistence`].
pub struct PersistenceStream<I> {
    input: I,
    options: WindowOptions,
    sunset: DateTime<Utc>,
    page: Option<PageState>,
    page_id: Option<i64>,
    pending: VecDeque<Result<RevisionRecord, PerstatError>>,
    exhausted: bool,
}

impl<I> PersistenceStream<I> {
    fn flush_page(&mut self) {
        if let Some(mut page) = self.page.take() {
            for record in page.flush(self.sunset) {
                self.pending.push_back(Ok(record));
            }
        }
    }
}

impl<I> Iterator for PersistenceStream<I>
where
    I: Iterator<Item = Result<RevisionRecord, PerstatError>>,
{
    type Item = Result<RevisionRecord, PerstatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            if self.exhausted {
                return None;
            }

            match self.input.next() {
                None => {
                    self.exhausted = true;
                    self.flush_page();
                }
                Some(Err(e)) => {
                    // The page's pipeline aborts; buffered entries are
                    // dropped rather than emitted half-observed.
                    self.page = None;
                    self.page_id = None;
                    return Some(Err(e));
                }
                Some(Ok(record)) => {
                    if self.page_id != Some(record.page.id) {
                        self.flush_page();
                        self.page_id = Some(record.page.id);
                        self.page = Some(PageState::new(&self.options));
                    }
                    let Some(page) = self.page.as_mut() else {
                        continue;
                    };
                    match page.process(record) {
                        Ok(Some(emitted)) => self.pending.push_back(Ok(emitted)),
                        Ok(None) => {}
                        Err(e) => {
                            self.page = None;
                            self.page_id = None;
                            return Some(Err(e));
                        }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

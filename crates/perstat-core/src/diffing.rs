//! Diff stage: enrich revision documents with token-level edit scripts.
//!
//! One diff processor runs per page, diffing each revision's text against
//! the previous one and recording the edit script as a `diff` block. The
//! diff is the expensive part of the whole pipeline, so a deadline can be
//! configured: a diff that overruns it is abandoned on its worker thread
//! and replaced by the trivial delete-all/insert-all script, with
//! `timedout` set on the record.

use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{trivial_operations, DiffEngine, DiffProcessor, RawToken};
use crate::errors::PerstatError;
use crate::ops::{ops_to_docs, Operation};
use crate::records::{DiffRecord, RevisionId, RevisionRecord};
use crate::state::text_checksum;

/// Options for the diff stage.
#[derive(Debug, Clone, Default)]
pub struct DiffingOptions {
    /// When set, pages outside these namespaces are skipped entirely.
    pub namespaces: Option<HashSet<i64>>,
    /// Deadline for a single diff invocation.
    pub timeout: Option<Duration>,
}

/// Run the diff stage over a page-partitioned record stream.
///
/// Records must carry `text`; output records additionally carry the `diff`
/// block, and `sha1` is filled in when missing.
pub fn diff_revisions<'e, I>(
    records: I,
    engine: &'e dyn DiffEngine,
    options: DiffingOptions,
) -> DiffStream<'e, I::IntoIter>
where
    I: IntoIterator<Item = Result<RevisionRecord, PerstatError>>,
{
    DiffStream {
        input: records.into_iter(),
        engine,
        options,
        processor: None,
        page_id: None,
        skip_page: None,
        last_id: None,
    }
}

/// Iterator returned by [`diff_revisions`].
pub struct DiffStream<'e, I> {
    input: I,
    engine: &'e dyn DiffEngine,
    options: DiffingOptions,
    processor: Option<Box<dyn DiffProcessor>>,
    page_id: Option<i64>,
    skip_page: Option<i64>,
    last_id: Option<RevisionId>,
}

impl<I> DiffStream<'_, I> {
    fn diff_one(&mut self, mut record: RevisionRecord) -> Result<RevisionRecord, PerstatError> {
        let text = record.text.clone().ok_or_else(|| {
            PerstatError::malformed(format!("revision {} has no text to diff", record.id))
        })?;
        if record.sha1.is_none() {
            record.sha1 = Some(text_checksum(&text));
        }

        let engine = self.engine;
        let processor = self
            .processor
            .get_or_insert_with(|| engine.processor());

        let started = Instant::now();
        let (operations, a, b, timedout) =
            diff_with_deadline(engine, processor, &text, self.options.timeout);

        record.diff = Some(DiffRecord {
            last_id: self.last_id,
            ops: ops_to_docs(&operations, &a, &b),
            timedout: self.options.timeout.map(|_| timedout),
            time: Some(started.elapsed().as_secs_f64()),
        });
        self.last_id = Some(record.id);
        Ok(record)
    }
}

impl<I> Iterator for DiffStream<'_, I>
where
    I: Iterator<Item = Result<RevisionRecord, PerstatError>>,
{
    type Item = Result<RevisionRecord, PerstatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.input.next()? {
                Ok(record) => record,
                Err(e) => {
                    // Abort whatever page was in flight.
                    self.processor = None;
                    self.page_id = None;
                    self.last_id = None;
                    return Some(Err(e));
                }
            };

            if self.page_id != Some(record.page.id) {
                self.page_id = Some(record.page.id);
                self.processor = None;
                self.last_id = None;
                self.skip_page = None;
                if let Some(namespaces) = &self.options.namespaces {
                    if !namespaces.contains(&record.page.namespace) {
                        self.skip_page = Some(record.page.id);
                    }
                }
            }
            if self.skip_page == Some(record.page.id) {
                continue;
            }

            return Some(self.diff_one(record));
        }
    }
}

/// Run one diff, optionally under a deadline.
///
/// The deadline path ships the processor to a worker thread; if the diff
/// overruns, the worker is abandoned (it finishes eventually and its
/// result is discarded) and a fresh processor is rebaselined on the new
/// text's tokens so the next diff stays consistent.
fn diff_with_deadline(
    engine: &dyn DiffEngine,
    processor: &mut Box<dyn DiffProcessor>,
    text: &str,
    timeout: Option<Duration>,
) -> (Vec<Operation>, Vec<RawToken>, Vec<RawToken>, bool) {
    let Some(timeout) = timeout else {
        let (operations, a, b) = processor.process(text);
        return (operations, a, b, false);
    };

    let baseline = processor.last_tokens().to_vec();
    let shipped = std::mem::replace(processor, engine.processor());
    let (tx, rx) = mpsc::channel();
    let owned_text = text.to_string();
    thread::spawn(move || {
        let mut shipped = shipped;
        let result = shipped.process(&owned_text);
        let _ = tx.send((result, shipped));
    });

    match rx.recv_timeout(timeout) {
        Ok(((operations, a, b), finished)) => {
            *processor = finished;
            (operations, a, b, false)
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = timeout.as_secs_f64(),
                "diff did not complete; recording trivial delete-all/insert-all script"
            );
            let b = engine.tokenize(text);
            let operations = trivial_operations(baseline.len(), b.len());
            processor.update_baseline(b.clone());
            (operations, baseline, b, true)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Stats stage: reduce per-token survival into per-revision statistics.
//!
//! A token is "persistent" when it stayed visible long enough
//! (`min_visible`) or survived enough later revisions (`min_persisted`).
//! The time threshold is checked first; only tokens that fail it consult
//! the review threshold, and only those can flag the revision as censored.
//! A token passing the review threshold still sets the censoring flag when
//! the revision's own observation was short: the counts are kept as
//! best-effort values with the marker alongside.

use regex::{Regex, RegexBuilder};

use crate::errors::PerstatError;
use crate::records::RevisionRecord;

/// Default minimum later revisions for the review threshold.
pub const DEFAULT_MIN_PERSISTED: usize = 5;

/// Default minimum visibility: 14 days, in seconds.
pub const DEFAULT_MIN_VISIBLE: f64 = 14.0 * 24.0 * 60.0 * 60.0;

// ============================================================================
// TokenFilter
// ============================================================================

/// Include/exclude predicates over token text.
///
/// Both patterns are case-insensitive and unanchored; exclusion wins.
#[derive(Debug, Clone, Default)]
pub struct TokenFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl TokenFilter {
    /// # Errors
    ///
    /// Returns [`PerstatError::InvalidFilter`] when a pattern does not
    /// compile.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, PerstatError> {
        let compile = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(PerstatError::from)
        };
        Ok(Self {
            include: include.map(compile).transpose()?,
            exclude: exclude.map(compile).transpose()?,
        })
    }

    pub fn admits(&self, text: &str) -> bool {
        self.include.as_ref().is_none_or(|re| re.is_match(text))
            && !self.exclude.as_ref().is_some_and(|re| re.is_match(text))
    }
}

// ============================================================================
// StatsOptions
// ============================================================================

/// Options for the stats stage.
#[derive(Debug, Clone)]
pub struct StatsOptions {
    pub min_persisted: usize,
    /// Seconds a token must stay visible to count as persistent outright.
    pub min_visible: f64,
    pub filter: TokenFilter,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            min_persisted: DEFAULT_MIN_PERSISTED,
            min_visible: DEFAULT_MIN_VISIBLE,
            filter: TokenFilter::default(),
        }
    }
}

// ============================================================================
// Reduction
// ============================================================================

/// Run the stats stage over a persistence-enriched record stream.
pub fn reduce_stats<I>(
    records: I,
    options: StatsOptions,
) -> impl Iterator<Item = Result<RevisionRecord, PerstatError>>
where
    I: IntoIterator<Item = Result<RevisionRecord, PerstatError>>,
{
    records
        .into_iter()
        .map(move |item| item.and_then(|record| reduce_one(record, &options)))
}

fn reduce_one(
    mut record: RevisionRecord,
    options: &StatsOptions,
) -> Result<RevisionRecord, PerstatError> {
    let block = record.persistence.as_mut().ok_or_else(|| {
        PerstatError::malformed(format!("revision {} has no persistence data", record.id))
    })?;
    let tokens = block.tokens.as_ref().ok_or_else(|| {
        PerstatError::malformed(format!("revision {} has no persistence tokens", record.id))
    })?;

    let mut tokens_added = 0usize;
    let mut persistent_tokens = 0usize;
    let mut non_self_persistent_tokens = 0usize;
    let mut sum_log_persisted = 0.0f64;
    let mut sum_log_non_self_persisted = 0.0f64;
    let mut sum_log_seconds_visible = 0.0f64;
    let mut censored = false;
    let mut non_self_censored = false;

    for token in tokens.iter().filter(|t| options.filter.admits(&t.text)) {
        tokens_added += 1;
        sum_log_persisted += ((token.persisted + 1) as f64).ln();
        sum_log_non_self_persisted += ((token.non_self_persisted + 1) as f64).ln();
        sum_log_seconds_visible += (token.seconds_visible + 1.0).ln();

        if token.seconds_visible >= options.min_visible {
            persistent_tokens += 1;
            non_self_persistent_tokens += 1;
        } else {
            // Review thresholds.
            if token.persisted >= options.min_persisted {
                persistent_tokens += 1;
            }
            if token.non_self_persisted >= options.min_persisted {
                non_self_persistent_tokens += 1;
            }

            // Censoring: was there enough observation to have passed?
            if block.seconds_possible < options.min_visible {
                censored = true;
                non_self_censored = true;
            } else {
                if block.revisions_processed < options.min_persisted {
                    censored = true;
                }
                if block.non_self_processed < options.min_persisted {
                    non_self_censored = true;
                }
            }
        }
    }

    block.tokens_added = Some(tokens_added);
    block.persistent_tokens = Some(persistent_tokens);
    block.non_self_persistent_tokens = Some(non_self_persistent_tokens);
    block.sum_log_persisted = Some(sum_log_persisted);
    block.sum_log_non_self_persisted = Some(sum_log_non_self_persisted);
    block.sum_log_seconds_visible = Some(sum_log_seconds_visible);
    block.censored = Some(censored);
    block.non_self_censored = Some(non_self_censored);

    Ok(record)
}

// ============================================================================
// Tests
// ============================================================================

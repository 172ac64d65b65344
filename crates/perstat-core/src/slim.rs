//! Record-slimming combinators.
//!
//! Each stage's output can carry the previous stage's bulky fields; these
//! adapters strip them unless the corresponding `--keep-*` flag asked for
//! them.

use crate::errors::PerstatError;
use crate::records::RevisionRecord;

type Item = Result<RevisionRecord, PerstatError>;

/// Drop the `text` field from every record.
pub fn drop_text<I>(records: I) -> impl Iterator<Item = Item>
where
    I: IntoIterator<Item = Item>,
{
    records.into_iter().map(|item| {
        item.map(|mut record| {
            record.text = None;
            record
        })
    })
}

/// Drop the `diff` block from every record.
pub fn drop_diff<I>(records: I) -> impl Iterator<Item = Item>
where
    I: IntoIterator<Item = Item>,
{
    records.into_iter().map(|item| {
        item.map(|mut record| {
            record.diff = None;
            record
        })
    })
}

/// Drop the per-token documents from every record's persistence block.
pub fn drop_tokens<I>(records: I) -> impl Iterator<Item = Item>
where
    I: IntoIterator<Item = Item>,
{
    records.into_iter().map(|item| {
        item.map(|mut record| {
            if let Some(block) = record.persistence.as_mut() {
                block.tokens = None;
            }
            record
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{PageRecord, PersistenceBlock, RevisionId};
    use chrono::{TimeZone, Utc};

    fn record() -> Item {
        Ok(RevisionRecord {
            id: RevisionId::new(1),
            timestamp: Utc.with_ymd_and_hms(2014, 9, 23, 12, 0, 0).unwrap(),
            sha1: None,
            text: Some("text".to_string()),
            user: None,
            page: PageRecord {
                id: 1,
                title: "T".to_string(),
                namespace: 0,
            },
            diff: None,
            persistence: Some(PersistenceBlock {
                tokens: Some(vec![]),
                ..Default::default()
            }),
            extra: Default::default(),
        })
    }

    #[test]
    fn test_drop_text_and_tokens() {
        let out: Vec<_> = drop_tokens(drop_text(vec![record()]))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert!(out[0].text.is_none());
        assert!(out[0].persistence.as_ref().unwrap().tokens.is_none());
    }
}

//! Recency-order checks for feed pages.
//!
//! The sync engine stops at the first record it already knows, which is only
//! correct when the feed is sorted newest first. These checks detect a feed
//! that breaks that contract so it can be reported; they never reorder.

use chrono::{DateTime, Utc};

use super::types::FeedRecord;

/// A record newer than one that preceded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderViolation {
    /// Position of the offending record among the observed records.
    pub index: usize,
    pub external_id: String,
    /// Oldest timestamp observed before this record.
    pub previous: DateTime<Utc>,
    pub current: DateTime<Utc>,
}

impl std::fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "record {} at position {} ({}) is newer than an earlier record ({})",
            self.external_id,
            self.index,
            self.current.to_rfc3339(),
            self.previous.to_rfc3339()
        )
    }
}

/// Tracks the oldest timestamp seen so far across one sync pass.
///
/// Records without a timestamp are counted but not compared.
#[derive(Debug, Default)]
pub struct RecencyGuard {
    floor: Option<DateTime<Utc>>,
    seen: usize,
}

impl RecencyGuard {
    pub fn observe(&mut self, record: &FeedRecord) -> Option<OrderViolation> {
        let index = self.seen;
        self.seen += 1;

        let current = record.source_timestamp?;
        match self.floor {
            Some(previous) if current > previous => Some(OrderViolation {
                index,
                external_id: record.external_id.clone(),
                previous,
                current,
            }),
            _ => {
                self.floor = Some(current);
                None
            }
        }
    }
}

/// Checks that timestamps never increase across `records`.
///
/// Returns the first violation found.
pub fn check_recency_order(records: &[FeedRecord]) -> Result<(), OrderViolation> {
    let mut guard = RecencyGuard::default();
    for record in records {
        if let Some(violation) = guard.observe(record) {
            return Err(violation);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn record(id: &str, day: Option<u32>) -> FeedRecord {
        FeedRecord {
            external_id: id.to_string(),
            title: String::new(),
            body: String::new(),
            url: String::new(),
            source_timestamp: day.map(|d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap()),
            tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_descending_is_ok() {
        let page = [record("a", Some(3)), record("b", Some(2)), record("c", Some(2))];
        assert!(check_recency_order(&page).is_ok());
    }

    #[test]
    fn test_ascending_is_reported() {
        let page = [record("a", Some(1)), record("b", Some(2))];
        let violation = check_recency_order(&page).unwrap_err();
        assert_eq!(violation.index, 1);
        assert_eq!(violation.external_id, "b");
        assert!(violation.to_string().contains("newer than an earlier record"));
    }

    #[test]
    fn test_undated_records_are_skipped() {
        let page = [record("a", Some(3)), record("b", None), record("c", Some(1))];
        assert!(check_recency_order(&page).is_ok());

        let page = [record("a", Some(1)), record("b", None), record("c", Some(3))];
        assert_eq!(check_recency_order(&page).unwrap_err().index, 2);
    }

    #[test]
    fn test_violation_does_not_lower_floor() {
        let mut guard = RecencyGuard::default();
        assert!(guard.observe(&record("a", Some(5))).is_none());
        assert!(guard.observe(&record("b", Some(9))).is_some());
        // Compared against day 5, not day 9
        assert!(guard.observe(&record("c", Some(4))).is_none());
    }
}

//! Time block records.
//!
//! A time block is a concrete half-open interval `[start, end)` of calendar
//! time, optionally linked to a task. Blocks never span midnight, so every
//! block belongs to exactly one calendar day and the quota ledger can key
//! on `(domain, day)` without splitting intervals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Domain;
use crate::error::ValidationError;

/// Time block status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    /// Scheduled but not started.
    Planned,
    /// Currently being worked.
    Active,
    /// Finished (terminal).
    Completed,
    /// Abandoned; excluded from conflict and quota computation (terminal).
    Cancelled,
}

impl BlockStatus {
    /// Whether a block in this status occupies calendar time for conflict
    /// detection. A person can only do one thing at a time, so planned and
    /// active blocks across all domains participate.
    pub fn occupies_time(&self) -> bool {
        matches!(self, BlockStatus::Planned | BlockStatus::Active)
    }

    /// Whether a block in this status counts toward its domain's quota.
    pub fn counts_toward_quota(&self) -> bool {
        matches!(
            self,
            BlockStatus::Planned | BlockStatus::Active | BlockStatus::Completed
        )
    }

    /// Stable snake_case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStatus::Planned => "planned",
            BlockStatus::Active => "active",
            BlockStatus::Completed => "completed",
            BlockStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete, non-overlapping interval of calendar time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlock {
    /// Unique identifier
    pub id: String,
    /// Interval start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Interval end (exclusive); same calendar day as start
    pub end_time: DateTime<Utc>,
    /// Life domain the block is budgeted against
    pub domain: Domain,
    /// Owning task, if any; buffer/break blocks stay unlinked
    pub linked_task_id: Option<String>,
    /// Current status
    pub status: BlockStatus,
    /// Self-assessed productivity 1-5, set after completion
    pub productivity_rating: Option<u8>,
    /// Set when this block pushed its domain past the soft quota
    #[serde(default)]
    pub quota_exceeded: bool,
    /// Monotonic version, incremented on every mutation
    pub version: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TimeBlock {
    /// Create a planned block, validating the interval.
    ///
    /// Rejects empty or inverted intervals and intervals that cross
    /// midnight. An end at exactly 00:00 of the following day is allowed
    /// since the interval is half-open.
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        domain: Domain,
    ) -> Result<Self, ValidationError> {
        if end_time <= start_time {
            return Err(ValidationError::InvalidTimeRange {
                start: start_time,
                end: end_time,
            });
        }
        let next_midnight = start_time
            .date_naive()
            .succ_opt()
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc());
        if let Some(midnight) = next_midnight {
            if end_time > midnight {
                return Err(ValidationError::CrossesMidnight {
                    start: start_time,
                    end: end_time,
                });
            }
        }
        let now = Utc::now();
        Ok(TimeBlock {
            id: uuid::Uuid::new_v4().to_string(),
            start_time,
            end_time,
            domain,
            linked_task_id: None,
            status: BlockStatus::Planned,
            productivity_rating: None,
            quota_exceeded: false,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Create a planned block linked to a task.
    pub fn for_task(
        task_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        domain: Domain,
    ) -> Result<Self, ValidationError> {
        let mut block = Self::new(start_time, end_time, domain)?;
        block.linked_task_id = Some(task_id.to_string());
        Ok(block)
    }

    /// The calendar day this block belongs to.
    pub fn day(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// Duration in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Half-open interval overlap: `[s1, e1)` and `[s2, e2)` conflict iff
    /// `s1 < e2 && s2 < e1`. Touching endpoints do not conflict.
    pub fn overlaps_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }

    /// Overlap against another block's interval.
    pub fn overlaps(&self, other: &TimeBlock) -> bool {
        self.overlaps_range(other.start_time, other.end_time)
    }

    /// Bump version and updated_at; call after any field mutation.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Move the block to a new start, preserving its duration.
    pub fn shift_to(&mut self, new_start: DateTime<Utc>) {
        let duration = self.end_time - self.start_time;
        self.start_time = new_start;
        self.end_time = new_start + duration;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    #[test]
    fn block_requires_positive_interval() {
        assert!(matches!(
            TimeBlock::new(at(10, 0), at(10, 0), Domain::Life),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            TimeBlock::new(at(11, 0), at(10, 0), Domain::Life),
            Err(ValidationError::InvalidTimeRange { .. })
        ));
    }

    #[test]
    fn block_rejects_midnight_crossing() {
        let start = at(23, 0);
        let end = start + Duration::hours(2);
        assert!(matches!(
            TimeBlock::new(start, end, Domain::Life),
            Err(ValidationError::CrossesMidnight { .. })
        ));
    }

    #[test]
    fn block_allows_end_at_next_midnight() {
        let start = at(23, 0);
        let end = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();
        let block = TimeBlock::new(start, end, Domain::Life).unwrap();
        assert_eq!(block.day(), start.date_naive());
        assert_eq!(block.duration_minutes(), 60);
    }

    #[test]
    fn half_open_overlap_semantics() {
        let block = TimeBlock::new(at(10, 0), at(11, 0), Domain::Income).unwrap();

        assert!(block.overlaps_range(at(10, 30), at(11, 30)));
        assert!(block.overlaps_range(at(9, 30), at(10, 1)));
        assert!(block.overlaps_range(at(10, 15), at(10, 45)));

        // Touching endpoints do not conflict.
        assert!(!block.overlaps_range(at(11, 0), at(12, 0)));
        assert!(!block.overlaps_range(at(9, 0), at(10, 0)));
    }

    #[test]
    fn status_participation() {
        assert!(BlockStatus::Planned.occupies_time());
        assert!(BlockStatus::Active.occupies_time());
        assert!(!BlockStatus::Completed.occupies_time());
        assert!(!BlockStatus::Cancelled.occupies_time());

        assert!(BlockStatus::Planned.counts_toward_quota());
        assert!(BlockStatus::Active.counts_toward_quota());
        assert!(BlockStatus::Completed.counts_toward_quota());
        assert!(!BlockStatus::Cancelled.counts_toward_quota());
    }

    #[test]
    fn shift_preserves_duration_and_bumps_version() {
        let mut block = TimeBlock::new(at(9, 0), at(10, 30), Domain::Growth).unwrap();
        block.shift_to(at(13, 0));
        assert_eq!(block.start_time, at(13, 0));
        assert_eq!(block.end_time, at(14, 30));
        assert_eq!(block.version, 2);
    }
}

//! Interval conflict detection across scheduled time blocks.
//!
//! A single person cannot occupy two blocks simultaneously, so conflicts
//! are checked across all domains. Only planned and active blocks
//! participate; completed and cancelled blocks no longer hold the
//! calendar. Daily cardinality is bounded (a few dozen blocks), so a
//! linear scan over a start-sorted snapshot is sufficient.

use chrono::{DateTime, Utc};

use crate::block::TimeBlock;

/// Conflict detector over a snapshot of time blocks.
pub struct ConflictDetector<'a> {
    /// Occupying blocks, sorted by start time.
    sorted: Vec<&'a TimeBlock>,
}

impl<'a> ConflictDetector<'a> {
    /// Build a detector from a snapshot. Non-occupying blocks are dropped
    /// up front so repeated queries only walk live intervals.
    pub fn new(blocks: &'a [TimeBlock]) -> Self {
        let mut sorted: Vec<&TimeBlock> =
            blocks.iter().filter(|b| b.status.occupies_time()).collect();
        sorted.sort_by_key(|b| b.start_time);
        Self { sorted }
    }

    /// Ids of blocks whose `[start, end)` interval overlaps the candidate.
    ///
    /// `exclude_block_id` omits one block from the check, for moves that
    /// re-place an existing block.
    pub fn find_conflicts(
        &self,
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
        exclude_block_id: Option<&str>,
    ) -> Vec<String> {
        let mut conflicts = Vec::new();
        for block in &self.sorted {
            if block.start_time >= candidate_end {
                break;
            }
            if let Some(excluded) = exclude_block_id {
                if block.id == excluded {
                    continue;
                }
            }
            if block.overlaps_range(candidate_start, candidate_end) {
                conflicts.push(block.id.clone());
            }
        }
        conflicts
    }

    /// True when the candidate interval is free.
    pub fn is_free(
        &self,
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
        exclude_block_id: Option<&str>,
    ) -> bool {
        self.find_conflicts(candidate_start, candidate_end, exclude_block_id)
            .is_empty()
    }

    /// The latest end time among blocks overlapping the candidate, used
    /// by the allocator to jump past a run of conflicts. None when free.
    pub fn next_free_after(
        &self,
        candidate_start: DateTime<Utc>,
        candidate_end: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        self.sorted
            .iter()
            .filter(|b| b.overlaps_range(candidate_start, candidate_end))
            .map(|b| b.end_time)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockStatus;
    use crate::domain::Domain;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn block(start: DateTime<Utc>, end: DateTime<Utc>, status: BlockStatus) -> TimeBlock {
        let mut block = TimeBlock::new(start, end, Domain::Income).unwrap();
        block.status = status;
        block
    }

    #[test]
    fn detects_overlap_regardless_of_domain() {
        let mut academic = TimeBlock::new(at(10, 0), at(11, 0), Domain::Academic).unwrap();
        academic.status = BlockStatus::Planned;
        let blocks = vec![academic.clone()];

        let detector = ConflictDetector::new(&blocks);
        let conflicts = detector.find_conflicts(at(10, 30), at(11, 30), None);
        assert_eq!(conflicts, vec![academic.id]);
    }

    #[test]
    fn touching_endpoints_do_not_conflict() {
        let blocks = vec![block(at(10, 0), at(11, 0), BlockStatus::Planned)];
        let detector = ConflictDetector::new(&blocks);
        assert!(detector.is_free(at(11, 0), at(12, 0), None));
        assert!(detector.is_free(at(9, 0), at(10, 0), None));
    }

    #[test]
    fn terminal_blocks_do_not_participate() {
        let blocks = vec![
            block(at(10, 0), at(11, 0), BlockStatus::Completed),
            block(at(11, 0), at(12, 0), BlockStatus::Cancelled),
        ];
        let detector = ConflictDetector::new(&blocks);
        assert!(detector.is_free(at(10, 0), at(12, 0), None));
    }

    #[test]
    fn exclusion_skips_the_named_block() {
        let moving = block(at(10, 0), at(11, 0), BlockStatus::Planned);
        let id = moving.id.clone();
        let detector_blocks = vec![moving];
        let detector = ConflictDetector::new(&detector_blocks);

        assert!(!detector.is_free(at(10, 30), at(11, 30), None));
        assert!(detector.is_free(at(10, 30), at(11, 30), Some(&id)));
    }

    #[test]
    fn reports_all_conflicting_ids() {
        let first = block(at(9, 0), at(10, 0), BlockStatus::Planned);
        let second = block(at(10, 30), at(11, 30), BlockStatus::Active);
        let ids = vec![first.id.clone(), second.id.clone()];
        let blocks = vec![first, second];

        let detector = ConflictDetector::new(&blocks);
        let conflicts = detector.find_conflicts(at(9, 30), at(11, 0), None);
        assert_eq!(conflicts, ids);
    }

    #[test]
    fn next_free_after_jumps_past_the_latest_overlap() {
        let blocks = vec![
            block(at(9, 0), at(10, 0), BlockStatus::Planned),
            block(at(10, 0), at(11, 30), BlockStatus::Planned),
        ];
        let detector = ConflictDetector::new(&blocks);
        assert_eq!(detector.next_free_after(at(9, 30), at(10, 30)), Some(at(11, 30)));
        assert_eq!(detector.next_free_after(at(12, 0), at(13, 0)), None);
    }
}

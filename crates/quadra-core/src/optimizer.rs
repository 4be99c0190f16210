//! Day-level schedule optimization.
//!
//! Rearranges a day's *planned* blocks to cut domain switching: blocks are
//! grouped by domain, sorted within each domain by priority score, and
//! packed back-to-back in the fixed domain order (academic, income,
//! growth, life) from each domain's window open, skipping frozen
//! (active/completed) intervals and anything already packed. Overflow past
//! a domain's quota is packed anyway but flagged, never dropped. A block
//! that would not finish before the next midnight is never moved there;
//! it keeps its original position and the rest pack around it.
//!
//! The optimizer only proposes: it reports old vs. new placement per block
//! and the caller decides whether to commit. Scoring uses the day's
//! midnight as its reference instant, so two runs over unchanged inputs
//! produce identical output regardless of when they are invoked.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{BlockStatus, TimeBlock};
use crate::domain::Domain;
use crate::quota::{QuotaLedger, QuotaPolicy};
use crate::scoring::PriorityScorer;
use crate::task::Task;
use crate::window::WorkingHours;

/// Proposed placement for one planned block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockPlacement {
    pub block_id: String,
    pub task_id: Option<String>,
    pub domain: Domain,
    pub old_start: DateTime<Utc>,
    pub old_end: DateTime<Utc>,
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
    /// True when this placement sits past the domain's soft quota.
    pub quota_exceeded: bool,
}

impl BlockPlacement {
    /// Whether the proposal actually moves the block.
    pub fn moved(&self) -> bool {
        self.old_start != self.new_start || self.old_end != self.new_end
    }
}

/// Result of optimizing one day. Applying it is the caller's decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizationResult {
    pub day: NaiveDate,
    /// One entry per planned block of the day, in packed order.
    pub placements: Vec<BlockPlacement>,
    /// Domain switches in the original chronological arrangement.
    pub switches_before: u32,
    /// Domain switches in the proposed arrangement.
    pub switches_after: u32,
}

impl OptimizationResult {
    /// Placements that actually move.
    pub fn moves(&self) -> impl Iterator<Item = &BlockPlacement> {
        self.placements.iter().filter(|p| p.moved())
    }

    /// True when nothing would change.
    pub fn is_noop(&self) -> bool {
        self.placements.iter().all(|p| !p.moved())
    }
}

/// Schedule optimizer for a single day's planned blocks.
pub struct ScheduleOptimizer {
    windows: WorkingHours,
    scorer: PriorityScorer,
    policy: QuotaPolicy,
}

impl ScheduleOptimizer {
    /// Optimizer with default windows, weights, and quota policy.
    pub fn new() -> Self {
        Self {
            windows: WorkingHours::default(),
            scorer: PriorityScorer::new(),
            policy: QuotaPolicy::default(),
        }
    }

    /// Optimizer with explicit collaborators.
    pub fn with_parts(windows: WorkingHours, scorer: PriorityScorer, policy: QuotaPolicy) -> Self {
        Self {
            windows,
            scorer,
            policy,
        }
    }

    /// Compute an improved arrangement for `day`.
    ///
    /// `blocks` is a frozen snapshot of all blocks (any day; non-matching
    /// days are ignored) and `tasks` the tasks they link to. Active and
    /// completed blocks are immovable and packed around.
    pub fn optimize(
        &self,
        day: NaiveDate,
        blocks: &[TimeBlock],
        tasks: &[Task],
    ) -> OptimizationResult {
        // Fixed reference instant keeps urgency-dependent scores stable
        // across repeated invocations within the same inputs.
        let reference = day.and_hms_opt(0, 0, 0).unwrap().and_utc();

        let frozen: Vec<&TimeBlock> = blocks
            .iter()
            .filter(|b| {
                b.day() == day
                    && matches!(b.status, BlockStatus::Active | BlockStatus::Completed)
            })
            .collect();
        let mut candidates: Vec<&TimeBlock> = blocks
            .iter()
            .filter(|b| b.day() == day && b.status == BlockStatus::Planned)
            .collect();

        let switches_before = Self::count_switches(
            frozen.iter().chain(candidates.iter()).copied(),
        );

        // Frozen consumption seeds the quota accounting for the day.
        let frozen_owned: Vec<TimeBlock> = frozen.iter().map(|b| (*b).clone()).collect();

        // Deterministic within-domain order: scored tasks first, unlinked
        // buffer blocks after, both with stable tie-breaks.
        candidates.sort_by(|a, b| {
            let task_a = a.linked_task_id.as_deref().and_then(|id| find_task(tasks, id));
            let task_b = b.linked_task_id.as_deref().and_then(|id| find_task(tasks, id));
            match (task_a, task_b) {
                (Some(ta), Some(tb)) => self.scorer.compare(ta, tb, reference),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| a.id.cmp(&b.id))
        });

        let day_end = day
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());

        // Blocks that cannot be re-packed before the next midnight keep
        // their original position. Pinning one invalidates the layout
        // built so far (an earlier placement may sit on its old slot),
        // so packing restarts until no placement overruns the day. Each
        // round pins at least one more block, so this terminates.
        let mut pinned: BTreeSet<String> = BTreeSet::new();
        let placements = loop {
            let mut ledger =
                QuotaLedger::from_snapshot(self.policy.clone(), &frozen_owned, tasks);

            // Intervals that may not be overwritten: frozen and pinned
            // first, packed blocks appended as they land.
            let mut occupied: Vec<(DateTime<Utc>, DateTime<Utc>)> = frozen
                .iter()
                .map(|b| (b.start_time, b.end_time))
                .chain(
                    candidates
                        .iter()
                        .filter(|b| pinned.contains(b.id.as_str()))
                        .map(|b| (b.start_time, b.end_time)),
                )
                .collect();
            occupied.sort();

            let mut placements = Vec::with_capacity(candidates.len());
            for domain in Domain::ORDER {
                let (window_open, _) = self.windows.window(domain).bounds_on(day);
                let mut cursor = window_open;

                for block in candidates.iter().filter(|b| b.domain == domain) {
                    let minutes = block.duration_minutes();
                    let quota_exceeded = ledger.would_exceed(domain, day, minutes as u32);
                    ledger.record(domain, day, minutes);

                    let (start, end) = if pinned.contains(block.id.as_str()) {
                        (block.start_time, block.end_time)
                    } else {
                        let duration = Duration::minutes(minutes);
                        let start = Self::first_fit(&occupied, cursor, duration);
                        let end = start + duration;
                        occupied.push((start, end));
                        occupied.sort();
                        cursor = end;
                        (start, end)
                    };

                    placements.push(BlockPlacement {
                        block_id: block.id.clone(),
                        task_id: block.linked_task_id.clone(),
                        domain,
                        old_start: block.start_time,
                        old_end: block.end_time,
                        new_start: start,
                        new_end: end,
                        quota_exceeded,
                    });
                }
            }

            let overran: Vec<String> = placements
                .iter()
                .filter(|p| day_end.is_some_and(|end| p.new_end > end))
                .map(|p| p.block_id.clone())
                .collect();
            if overran.is_empty() {
                break placements;
            }
            pinned.extend(overran);
        };

        let switches_after = Self::count_switches_placed(&frozen, &placements);

        OptimizationResult {
            day,
            placements,
            switches_before,
            switches_after,
        }
    }

    /// Earliest start at or after `from` where `[start, start+duration)`
    /// misses every occupied interval.
    fn first_fit(
        occupied: &[(DateTime<Utc>, DateTime<Utc>)],
        from: DateTime<Utc>,
        duration: Duration,
    ) -> DateTime<Utc> {
        let mut start = from;
        loop {
            let end = start + duration;
            match occupied
                .iter()
                .filter(|(s, e)| *s < end && start < *e)
                .map(|(_, e)| *e)
                .max()
            {
                None => return start,
                Some(jump) => start = jump,
            }
        }
    }

    fn count_switches<'a>(blocks: impl Iterator<Item = &'a TimeBlock>) -> u32 {
        let mut timeline: Vec<(DateTime<Utc>, Domain)> =
            blocks.map(|b| (b.start_time, b.domain)).collect();
        timeline.sort();
        timeline
            .windows(2)
            .filter(|pair| pair[0].1 != pair[1].1)
            .count() as u32
    }

    fn count_switches_placed(frozen: &[&TimeBlock], placements: &[BlockPlacement]) -> u32 {
        let mut timeline: Vec<(DateTime<Utc>, Domain)> = frozen
            .iter()
            .map(|b| (b.start_time, b.domain))
            .chain(placements.iter().map(|p| (p.new_start, p.domain)))
            .collect();
        timeline.sort();
        timeline
            .windows(2)
            .filter(|pair| pair[0].1 != pair[1].1)
            .count() as u32
    }
}

impl Default for ScheduleOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn linked(task: &Task, start: DateTime<Utc>, minutes: i64) -> TimeBlock {
        TimeBlock::for_task(
            &task.id,
            start,
            start + Duration::minutes(minutes),
            task.domain,
        )
        .unwrap()
    }

    fn task(domain: Domain, priority: u8) -> Task {
        let mut task = Task::new(format!("p{priority}"), domain, 60);
        task.priority = priority;
        task
    }

    #[test]
    fn packs_single_domain_sorted_by_score() {
        // Scenario: five tasks in one domain, priorities {3,1,4,1,2} ->
        // packed contiguously, priority 1s first, FIFO between equals.
        let mut tasks: Vec<Task> = [3u8, 1, 4, 1, 2]
            .iter()
            .map(|&p| task(Domain::Academic, p))
            .collect();
        // Make creation order deterministic and distinct.
        for (i, t) in tasks.iter_mut().enumerate() {
            t.created_at = at(0, 0) + Duration::seconds(i as i64);
        }

        let blocks: Vec<TimeBlock> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| linked(t, at(10, 0) + Duration::minutes(90 * i as i64), 60))
            .collect();

        let result = ScheduleOptimizer::new().optimize(day(), &blocks, &tasks);

        let order: Vec<u8> = result
            .placements
            .iter()
            .map(|p| {
                tasks
                    .iter()
                    .find(|t| Some(t.id.as_str()) == p.task_id.as_deref())
                    .unwrap()
                    .priority
            })
            .collect();
        assert_eq!(order, vec![1, 1, 2, 3, 4]);

        // Priority-1 FIFO tie-break: the earlier-created one leads.
        let first = &result.placements[0];
        let second = &result.placements[1];
        assert_eq!(first.task_id.as_deref(), Some(tasks[1].id.as_str()));
        assert_eq!(second.task_id.as_deref(), Some(tasks[3].id.as_str()));

        // Contiguous from window open, non-overlapping.
        assert_eq!(result.placements[0].new_start, at(9, 0));
        for pair in result.placements.windows(2) {
            assert_eq!(pair[0].new_end, pair[1].new_start);
        }
    }

    #[test]
    fn domains_pack_in_fixed_order() {
        let academic = task(Domain::Academic, 3);
        let income = task(Domain::Income, 1);
        let growth = task(Domain::Growth, 2);
        let life = task(Domain::Life, 1);
        let tasks = vec![life.clone(), growth.clone(), income.clone(), academic.clone()];

        // Scattered blocks, deliberately out of domain order.
        let blocks = vec![
            linked(&life, at(9, 0), 60),
            linked(&growth, at(10, 30), 60),
            linked(&income, at(12, 0), 60),
            linked(&academic, at(14, 0), 60),
        ];

        let result = ScheduleOptimizer::new().optimize(day(), &blocks, &tasks);

        let domains: Vec<Domain> = result.placements.iter().map(|p| p.domain).collect();
        assert_eq!(
            domains,
            vec![Domain::Academic, Domain::Income, Domain::Growth, Domain::Life]
        );
        assert!(result.switches_after <= result.switches_before);

        // Shared 09:00 window opens: later domains queue behind earlier ones.
        assert_eq!(result.placements[0].new_start, at(9, 0));
        assert_eq!(result.placements[1].new_start, at(10, 0));
        assert_eq!(result.placements[2].new_start, at(11, 0));
        assert_eq!(result.placements[3].new_start, at(12, 0));
    }

    #[test]
    fn optimizer_is_idempotent() {
        let tasks: Vec<Task> = vec![
            task(Domain::Academic, 2),
            task(Domain::Academic, 1),
            task(Domain::Income, 3),
        ];
        let blocks: Vec<TimeBlock> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| linked(t, at(11, 0) + Duration::minutes(75 * i as i64), 45))
            .collect();

        let optimizer = ScheduleOptimizer::new();
        let first = optimizer.optimize(day(), &blocks, &tasks);

        // Apply the proposal, then optimize again: nothing should move.
        let mut applied = blocks.clone();
        for placement in &first.placements {
            let block = applied
                .iter_mut()
                .find(|b| b.id == placement.block_id)
                .unwrap();
            block.shift_to(placement.new_start);
        }
        let second = optimizer.optimize(day(), &applied, &tasks);

        assert!(second.is_noop());
        let first_arrangement: Vec<(String, DateTime<Utc>, DateTime<Utc>)> = first
            .placements
            .iter()
            .map(|p| (p.block_id.clone(), p.new_start, p.new_end))
            .collect();
        let second_arrangement: Vec<(String, DateTime<Utc>, DateTime<Utc>)> = second
            .placements
            .iter()
            .map(|p| (p.block_id.clone(), p.new_start, p.new_end))
            .collect();
        assert_eq!(first_arrangement, second_arrangement);
    }

    #[test]
    fn frozen_blocks_are_skipped_not_moved() {
        let running = task(Domain::Academic, 1);
        let pending = task(Domain::Academic, 2);
        let tasks = vec![running.clone(), pending.clone()];

        let mut active = linked(&running, at(9, 0), 90);
        active.status = BlockStatus::Active;
        let planned = linked(&pending, at(13, 0), 60);
        let blocks = vec![active.clone(), planned.clone()];

        let result = ScheduleOptimizer::new().optimize(day(), &blocks, &tasks);

        // Only the planned block appears, packed right after the frozen one.
        assert_eq!(result.placements.len(), 1);
        let placement = &result.placements[0];
        assert_eq!(placement.block_id, planned.id);
        assert_eq!(placement.new_start, at(10, 30));
    }

    #[test]
    fn overflow_is_packed_but_flagged() {
        // Three 2-hour academic blocks against a 240-minute quota: the
        // third crosses the budget and is flagged, never dropped.
        let tasks: Vec<Task> = (1..=3).map(|p| task(Domain::Academic, p as u8)).collect();
        let blocks: Vec<TimeBlock> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| linked(t, at(9, 0) + Duration::minutes(130 * i as i64), 120))
            .collect();

        let result = ScheduleOptimizer::new().optimize(day(), &blocks, &tasks);

        assert_eq!(result.placements.len(), 3);
        assert!(!result.placements[0].quota_exceeded);
        assert!(!result.placements[1].quota_exceeded);
        assert!(result.placements[2].quota_exceeded);
    }

    #[test]
    fn overfull_day_never_packs_past_midnight() {
        // Thirteen 70-minute academic blocks fill more of the day than
        // fits between 09:00 and midnight. Packing must not push any of
        // them into the next day; the ones that do not fit stay put.
        let mut tasks: Vec<Task> = (0..13).map(|_| task(Domain::Academic, 3)).collect();
        for (i, t) in tasks.iter_mut().enumerate() {
            t.created_at = at(0, 0) + Duration::seconds(i as i64);
        }
        let blocks: Vec<TimeBlock> = tasks
            .iter()
            .enumerate()
            .map(|(i, t)| linked(t, at(0, 30) + Duration::minutes(80 * i as i64), 70))
            .collect();

        let result = ScheduleOptimizer::new().optimize(day(), &blocks, &tasks);

        assert_eq!(result.placements.len(), 13);
        let midnight = at(0, 0) + Duration::days(1);
        for p in &result.placements {
            assert_eq!(p.new_start.date_naive(), day());
            assert!(p.new_end <= midnight, "{} ends at {}", p.block_id, p.new_end);
        }
        // The proposed arrangement is still conflict-free.
        let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> = result
            .placements
            .iter()
            .map(|p| (p.new_start, p.new_end))
            .collect();
        intervals.sort();
        for pair in intervals.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
        // At least one block had to stay at its original slot.
        assert!(result.placements.iter().any(|p| !p.moved()));
    }

    #[test]
    fn other_days_are_untouched() {
        let t = task(Domain::Income, 2);
        let other_day_block = linked(&t, at(10, 0) + Duration::days(3), 60);
        let result =
            ScheduleOptimizer::new().optimize(day(), &[other_day_block], &[t]);
        assert!(result.placements.is_empty());
    }

    #[test]
    fn unlinked_buffer_blocks_pack_after_scored_tasks() {
        let scored = task(Domain::Life, 4);
        let buffer = TimeBlock::new(at(9, 0), at(9, 30), Domain::Life).unwrap();
        let scored_block = linked(&scored, at(12, 0), 60);

        let result = ScheduleOptimizer::new().optimize(
            day(),
            &[buffer.clone(), scored_block.clone()],
            std::slice::from_ref(&scored),
        );

        assert_eq!(result.placements[0].block_id, scored_block.id);
        assert_eq!(result.placements[1].block_id, buffer.id);
        assert_eq!(result.placements[1].new_start, result.placements[0].new_end);
    }
}

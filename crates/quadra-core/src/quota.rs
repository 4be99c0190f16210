//! Domain quota tracking.
//!
//! Each domain has a soft daily budget in minutes (default 240, the
//! 4x4-hour model; sleep holds a further 480 outside all domains). The
//! ledger is an explicit snapshot object passed into every call — there
//! is no hidden process-wide state, and persistence of the underlying
//! blocks stays with the caller. Quota is a soft budget: consumption may
//! exceed allocation, but any allocation crossing the line is flagged
//! rather than silently accepted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::block::TimeBlock;
use crate::domain::{Domain, DEFAULT_DOMAIN_QUOTA_MINUTES, SLEEP_RESERVED_MINUTES};
use crate::task::Task;

/// Per-domain daily budgets in minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaPolicy {
    #[serde(default = "default_domain_minutes")]
    pub academic_minutes: u32,
    #[serde(default = "default_domain_minutes")]
    pub income_minutes: u32,
    #[serde(default = "default_domain_minutes")]
    pub growth_minutes: u32,
    #[serde(default = "default_domain_minutes")]
    pub life_minutes: u32,
    /// Reserved for sleep, outside the four domains.
    #[serde(default = "default_sleep_minutes")]
    pub sleep_minutes: u32,
}

fn default_domain_minutes() -> u32 {
    DEFAULT_DOMAIN_QUOTA_MINUTES
}

fn default_sleep_minutes() -> u32 {
    SLEEP_RESERVED_MINUTES
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            academic_minutes: DEFAULT_DOMAIN_QUOTA_MINUTES,
            income_minutes: DEFAULT_DOMAIN_QUOTA_MINUTES,
            growth_minutes: DEFAULT_DOMAIN_QUOTA_MINUTES,
            life_minutes: DEFAULT_DOMAIN_QUOTA_MINUTES,
            sleep_minutes: SLEEP_RESERVED_MINUTES,
        }
    }
}

impl QuotaPolicy {
    /// Allocated minutes for a domain.
    pub fn allocated(&self, domain: Domain) -> u32 {
        match domain {
            Domain::Academic => self.academic_minutes,
            Domain::Income => self.income_minutes,
            Domain::Growth => self.growth_minutes,
            Domain::Life => self.life_minutes,
        }
    }
}

/// Snapshot of a domain's quota for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaStatus {
    pub domain: Domain,
    pub day: NaiveDate,
    pub allocated_minutes: u32,
    pub consumed_minutes: u32,
    /// True when consumption exceeds the soft budget.
    pub quota_exceeded: bool,
}

/// Per-day, per-domain capacity and consumption ledger.
///
/// Built from an explicit snapshot of blocks (and their tasks, for
/// actual-vs-planned consumption on completion) and mutated additively as
/// blocks are created or cancelled within one allocation attempt.
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    policy: QuotaPolicy,
    consumed: BTreeMap<(Domain, NaiveDate), i64>,
}

impl QuotaLedger {
    /// Empty ledger under a policy.
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            policy,
            consumed: BTreeMap::new(),
        }
    }

    /// Rebuild consumption from a snapshot of blocks.
    ///
    /// Planned and active blocks contribute their planned duration.
    /// Completed blocks contribute the owning task's actual minutes when
    /// recorded, otherwise their planned duration. Cancelled blocks
    /// contribute nothing.
    pub fn from_snapshot(policy: QuotaPolicy, blocks: &[TimeBlock], tasks: &[Task]) -> Self {
        let mut ledger = Self::new(policy);
        for block in blocks {
            if !block.status.counts_toward_quota() {
                continue;
            }
            let minutes = if block.status == crate::block::BlockStatus::Completed {
                block
                    .linked_task_id
                    .as_deref()
                    .and_then(|task_id| tasks.iter().find(|t| t.id == task_id))
                    .and_then(|t| t.actual_minutes)
                    .map(|m| m as i64)
                    .unwrap_or_else(|| block.duration_minutes())
            } else {
                block.duration_minutes()
            };
            ledger.record(block.domain, block.day(), minutes);
        }
        ledger
    }

    /// Allocated minutes for a domain/day.
    pub fn capacity(&self, domain: Domain, _day: NaiveDate) -> u32 {
        self.policy.allocated(domain)
    }

    /// Consumed minutes for a domain/day. Never negative.
    pub fn consumed(&self, domain: Domain, day: NaiveDate) -> u32 {
        self.consumed
            .get(&(domain, day))
            .copied()
            .unwrap_or(0)
            .max(0) as u32
    }

    /// Would adding `additional_minutes` push the domain past its budget?
    pub fn would_exceed(&self, domain: Domain, day: NaiveDate, additional_minutes: u32) -> bool {
        self.consumed(domain, day) + additional_minutes > self.capacity(domain, day)
    }

    /// Record consumption additively; negative deltas release minutes on
    /// cancellation. Consumption is floored at zero.
    pub fn record(&mut self, domain: Domain, day: NaiveDate, delta_minutes: i64) {
        let entry = self.consumed.entry((domain, day)).or_insert(0);
        *entry = (*entry + delta_minutes).max(0);
    }

    /// Full status for one domain/day.
    pub fn status(&self, domain: Domain, day: NaiveDate) -> QuotaStatus {
        let allocated = self.capacity(domain, day);
        let consumed = self.consumed(domain, day);
        QuotaStatus {
            domain,
            day,
            allocated_minutes: allocated,
            consumed_minutes: consumed,
            quota_exceeded: consumed > allocated,
        }
    }

    /// The policy this ledger was built under.
    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockStatus;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn empty_ledger_has_zero_consumption() {
        let ledger = QuotaLedger::new(QuotaPolicy::default());
        assert_eq!(ledger.consumed(Domain::Academic, day()), 0);
        assert_eq!(ledger.capacity(Domain::Academic, day()), 240);
        assert!(!ledger.would_exceed(Domain::Academic, day(), 240));
        assert!(ledger.would_exceed(Domain::Academic, day(), 241));
    }

    #[test]
    fn record_accumulates_and_releases() {
        let mut ledger = QuotaLedger::new(QuotaPolicy::default());
        ledger.record(Domain::Income, day(), 120);
        assert_eq!(ledger.consumed(Domain::Income, day()), 120);

        ledger.record(Domain::Income, day(), 180);
        assert_eq!(ledger.consumed(Domain::Income, day()), 300);
        assert!(ledger.status(Domain::Income, day()).quota_exceeded);

        // Allocate-then-cancel round-trips to the prior consumption.
        ledger.record(Domain::Income, day(), -180);
        assert_eq!(ledger.consumed(Domain::Income, day()), 120);
        assert!(!ledger.status(Domain::Income, day()).quota_exceeded);
    }

    #[test]
    fn consumption_never_goes_negative() {
        let mut ledger = QuotaLedger::new(QuotaPolicy::default());
        ledger.record(Domain::Life, day(), -90);
        assert_eq!(ledger.consumed(Domain::Life, day()), 0);
    }

    #[test]
    fn days_are_independent() {
        let mut ledger = QuotaLedger::new(QuotaPolicy::default());
        let other_day = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        ledger.record(Domain::Growth, day(), 200);
        assert_eq!(ledger.consumed(Domain::Growth, other_day), 0);
    }

    #[test]
    fn snapshot_skips_cancelled_blocks() {
        let mut planned = TimeBlock::new(at(9, 0), at(10, 0), Domain::Academic).unwrap();
        planned.status = BlockStatus::Planned;
        let mut cancelled = TimeBlock::new(at(10, 0), at(11, 0), Domain::Academic).unwrap();
        cancelled.status = BlockStatus::Cancelled;

        let ledger =
            QuotaLedger::from_snapshot(QuotaPolicy::default(), &[planned, cancelled], &[]);
        assert_eq!(ledger.consumed(Domain::Academic, day()), 60);
    }

    #[test]
    fn snapshot_uses_actual_minutes_for_completed_blocks() {
        let mut task = Task::new("Invoices", Domain::Income, 120);
        task.actual_minutes = Some(90);

        let mut block = TimeBlock::for_task(&task.id, at(9, 0), at(11, 0), Domain::Income).unwrap();
        block.status = BlockStatus::Completed;

        let ledger = QuotaLedger::from_snapshot(
            QuotaPolicy::default(),
            std::slice::from_ref(&block),
            std::slice::from_ref(&task),
        );
        assert_eq!(ledger.consumed(Domain::Income, day()), 90);
    }

    #[test]
    fn custom_policy_capacity() {
        let policy = QuotaPolicy {
            academic_minutes: 300,
            ..QuotaPolicy::default()
        };
        let ledger = QuotaLedger::new(policy);
        assert_eq!(ledger.capacity(Domain::Academic, day()), 300);
        assert_eq!(ledger.capacity(Domain::Life, day()), 240);
    }
}

//! Slot allocation: finding a concrete time block for a pending task.
//!
//! The allocator scans forward from "now" through the task's domain
//! working window for the earliest conflict-free interval of the task's
//! estimated length. Candidates that would cross the window's close roll
//! over to the next day's matching window, up to a bounded look-ahead.
//! Quota is a soft budget: an allocation that would push the domain past
//! its daily allocation proceeds anyway but carries `quota_exceeded`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::block::TimeBlock;
use crate::conflict::ConflictDetector;
use crate::error::{CoreError, NoFeasibleSlotError, ValidationError};
use crate::quota::QuotaLedger;
use crate::task::Task;
use crate::window::WorkingHours;

/// Default bounded look-ahead, in days.
pub const DEFAULT_LOOK_AHEAD_DAYS: u32 = 14;

/// Allocator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocatorConfig {
    /// Per-domain working windows.
    pub windows: WorkingHours,
    /// How many days forward to scan before giving up.
    pub look_ahead_days: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            windows: WorkingHours::default(),
            look_ahead_days: DEFAULT_LOOK_AHEAD_DAYS,
        }
    }
}

/// A successful allocation: the proposed block plus its quota verdict.
///
/// Nothing is persisted here; the caller commits the block and the task
/// status change in one transaction.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub block: TimeBlock,
    pub quota_exceeded: bool,
}

/// Earliest-fit slot allocator.
pub struct SlotAllocator {
    config: AllocatorConfig,
}

impl SlotAllocator {
    /// Allocator with default windows and look-ahead.
    pub fn new() -> Self {
        Self {
            config: AllocatorConfig::default(),
        }
    }

    /// Allocator with custom config.
    pub fn with_config(config: AllocatorConfig) -> Self {
        Self { config }
    }

    /// Propose the earliest feasible block for a pending task.
    ///
    /// `blocks` is the snapshot of existing blocks across the look-ahead
    /// horizon and `ledger` the quota snapshot for the same blocks. The
    /// proposed block is planned, linked to the task, and flagged when it
    /// pushes the domain past its soft quota.
    pub fn allocate(
        &self,
        task: &Task,
        blocks: &[TimeBlock],
        ledger: &QuotaLedger,
        now: DateTime<Utc>,
    ) -> Result<AllocationOutcome, CoreError> {
        if task.estimated_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration { minutes: 0 }.into());
        }

        let duration = Duration::minutes(task.estimated_minutes as i64);
        let window = self.config.windows.window(task.domain);
        let detector = ConflictDetector::new(blocks);

        for day_offset in 0..self.config.look_ahead_days {
            let day = now.date_naive() + Duration::days(day_offset as i64);
            let (window_open, window_close) = window.bounds_on(day);

            let mut candidate = if day_offset == 0 {
                window_open.max(now)
            } else {
                window_open
            };

            // Earliest-fit scan: jump past each run of conflicts until the
            // interval fits or the window closes.
            while candidate + duration <= window_close {
                match detector.next_free_after(candidate, candidate + duration) {
                    None => {
                        let quota_exceeded =
                            ledger.would_exceed(task.domain, day, task.estimated_minutes);
                        let mut block = TimeBlock::for_task(
                            &task.id,
                            candidate,
                            candidate + duration,
                            task.domain,
                        )?;
                        block.quota_exceeded = quota_exceeded;
                        return Ok(AllocationOutcome {
                            block,
                            quota_exceeded,
                        });
                    }
                    Some(next_free) => candidate = next_free,
                }
            }
        }

        Err(NoFeasibleSlotError {
            task_id: task.id.clone(),
            look_ahead_days: self.config.look_ahead_days,
        }
        .into())
    }

    /// The configured working windows.
    pub fn windows(&self) -> &WorkingHours {
        &self.config.windows
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new()
    }
}

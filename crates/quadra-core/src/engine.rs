//! The scheduling engine: the operation surface exposed to API/CLI layers.
//!
//! Ties the pure components (scorer, conflict detector, quota ledger,
//! allocator, optimizer) to the SQLite store. Every operation loads a
//! fresh snapshot, computes over it, and commits through version-guarded
//! writes; a racing caller gets [`crate::error::ConcurrencyError`] back
//! and is expected to re-read and retry. Allocation is all-or-nothing per
//! attempt: the block insert and the task status change share one
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};

use crate::allocator::{AllocatorConfig, SlotAllocator};
use crate::block::{BlockStatus, TimeBlock};
use crate::conflict::ConflictDetector;
use crate::domain::Domain;
use crate::error::{ConflictError, Result, ValidationError};
use crate::optimizer::{OptimizationResult, ScheduleOptimizer};
use crate::quality::{self, ScheduleQuality};
use crate::quota::{QuotaLedger, QuotaPolicy, QuotaStatus};
use crate::scoring::{PriorityScorer, ScoreWeights};
use crate::storage::{Config, ScheduleDb};
use crate::task::{ClassifiedInput, Task, TaskStatus};
use crate::window::WorkingHours;

/// Validated engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: QuotaPolicy,
    pub windows: WorkingHours,
    pub weights: ScoreWeights,
    pub look_ahead_days: u32,
}

impl EngineConfig {
    /// Build from the TOML config, validating windows and weights.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            policy: config.quotas.clone(),
            windows: config.working_hours()?,
            weights: config.score_weights()?,
            look_ahead_days: config.allocator.look_ahead_days,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: QuotaPolicy::default(),
            windows: WorkingHours::default(),
            weights: ScoreWeights::default(),
            look_ahead_days: crate::allocator::DEFAULT_LOOK_AHEAD_DAYS,
        }
    }
}

/// The scheduling engine over a database.
pub struct Engine {
    db: ScheduleDb,
    config: EngineConfig,
    scorer: PriorityScorer,
    allocator: SlotAllocator,
}

impl Engine {
    /// Engine over an explicit database and config.
    pub fn new(db: ScheduleDb, config: EngineConfig) -> Result<Self> {
        let scorer = PriorityScorer::with_weights(config.weights)?;
        let allocator = SlotAllocator::with_config(AllocatorConfig {
            windows: config.windows,
            look_ahead_days: config.look_ahead_days,
        });
        Ok(Self {
            db,
            config,
            scorer,
            allocator,
        })
    }

    /// Engine over the default database and on-disk config.
    pub fn open() -> Result<Self> {
        let config = EngineConfig::from_config(&Config::load()?)?;
        Self::new(ScheduleDb::open()?, config)
    }

    /// In-memory engine for tests.
    pub fn in_memory() -> Result<Self> {
        Self::new(ScheduleDb::open_in_memory()?, EngineConfig::default())
    }

    // === Tasks ===

    /// Create a pending task from the classifier's output.
    pub fn create_task(&self, input: ClassifiedInput) -> Result<Task> {
        let task = Task::from_input(input)?;
        self.db.create_task(&task)?;
        Ok(task)
    }

    /// Fetch a task.
    pub fn get_task(&self, task_id: &str) -> Result<Task> {
        self.db.get_task(task_id)
    }

    /// List tasks with optional filters.
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        domain: Option<Domain>,
    ) -> Result<Vec<Task>> {
        self.db.list_tasks(status, domain)
    }

    /// Allocate a time block for a pending task.
    ///
    /// On success the task is scheduled, linked to the new planned block,
    /// and its score cached; both records land in one transaction. On
    /// `NoFeasibleSlotError` the task stays pending and untouched.
    pub fn allocate(&mut self, task_id: &str) -> Result<TimeBlock> {
        self.allocate_at(task_id, Utc::now())
    }

    /// Allocation with an explicit "now", for deterministic callers.
    pub fn allocate_at(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<TimeBlock> {
        let mut task = self.db.get_task(task_id)?;
        let loaded_version = task.version;
        if task.status != TaskStatus::Pending {
            return Err(ValidationError::UnexpectedStatus {
                id: task.id.clone(),
                status: task.status,
                expected: TaskStatus::Pending,
            }
            .into());
        }

        let blocks = self.db.list_blocks()?;
        let tasks = self.db.list_tasks(None, None)?;
        let ledger = QuotaLedger::from_snapshot(self.config.policy.clone(), &blocks, &tasks);

        let outcome = self.allocator.allocate(&task, &blocks, &ledger, now)?;

        task.ai_priority_score = Some(self.scorer.score(&task, now));
        task.linked_time_block_id = Some(outcome.block.id.clone());
        task.quota_exceeded = outcome.quota_exceeded;
        task.transition_to(TaskStatus::Scheduled)?;

        self.db
            .commit_allocation(&task, &outcome.block, loaded_version)?;
        Ok(outcome.block)
    }

    /// Move a scheduled task into progress, activating its block.
    pub fn start_task(&mut self, task_id: &str) -> Result<Task> {
        let mut task = self.db.get_task(task_id)?;
        let task_version = task.version;
        task.transition_to(TaskStatus::InProgress)?;

        match task.linked_time_block_id.clone() {
            Some(block_id) => {
                let mut block = self.db.get_block(&block_id)?;
                let block_version = block.version;
                block.status = BlockStatus::Active;
                block.touch();
                self.db
                    .commit_block_and_task(&block, block_version, Some((&task, task_version)))?;
            }
            None => self.db.update_task(&task, task_version)?,
        }
        Ok(task)
    }

    /// Complete a task, recording actual minutes (defaults to the
    /// estimate) and completing its block atomically.
    pub fn complete_task(&mut self, task_id: &str, actual_minutes: Option<u32>) -> Result<Task> {
        let mut task = self.db.get_task(task_id)?;
        let task_version = task.version;
        let block_id = task.linked_time_block_id.clone();

        task.actual_minutes = Some(actual_minutes.unwrap_or(task.estimated_minutes));
        task.transition_to(TaskStatus::Completed)?;

        match block_id {
            Some(block_id) => {
                let mut block = self.db.get_block(&block_id)?;
                let block_version = block.version;
                block.status = BlockStatus::Completed;
                block.touch();
                self.db
                    .commit_block_and_task(&block, block_version, Some((&task, task_version)))?;
            }
            None => self.db.update_task(&task, task_version)?,
        }
        Ok(task)
    }

    /// Cancel a task, releasing its planned block (and thus its quota
    /// contribution) in the same transaction.
    pub fn cancel_task(&mut self, task_id: &str) -> Result<Task> {
        self.release_task(task_id, TaskStatus::Cancelled)
    }

    /// Defer a task out of the current plan; its planned block is
    /// cancelled and the task can be re-activated later.
    pub fn defer_task(&mut self, task_id: &str) -> Result<Task> {
        self.release_task(task_id, TaskStatus::Deferred)
    }

    /// Re-activate a deferred task back to pending.
    pub fn reactivate_task(&mut self, task_id: &str) -> Result<Task> {
        let mut task = self.db.get_task(task_id)?;
        let version = task.version;
        task.transition_to(TaskStatus::Pending)?;
        self.db.update_task(&task, version)?;
        Ok(task)
    }

    fn release_task(&mut self, task_id: &str, to: TaskStatus) -> Result<Task> {
        let mut task = self.db.get_task(task_id)?;
        let task_version = task.version;
        let block_id = task.linked_time_block_id.clone();
        task.transition_to(to)?;

        match block_id {
            Some(block_id) => {
                let mut block = self.db.get_block(&block_id)?;
                let block_version = block.version;
                block.status = BlockStatus::Cancelled;
                block.touch();
                self.db
                    .commit_block_and_task(&block, block_version, Some((&task, task_version)))?;
            }
            None => self.db.update_task(&task, task_version)?,
        }
        Ok(task)
    }

    // === Time blocks ===

    /// Create a manual time block (optionally task-linked), rejecting
    /// overlaps with the conflicting ids.
    pub fn create_block(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        domain: Domain,
        linked_task_id: Option<&str>,
    ) -> Result<TimeBlock> {
        let snapshot = self.db.list_blocks()?;
        let detector = ConflictDetector::new(&snapshot);
        let conflicts = detector.find_conflicts(start, end, None);
        if !conflicts.is_empty() {
            return Err(ConflictError {
                start,
                end,
                conflicting_ids: conflicts,
            }
            .into());
        }

        let mut block = TimeBlock::new(start, end, domain)?;
        block.linked_task_id = linked_task_id.map(String::from);

        let tasks = self.db.list_tasks(None, None)?;
        let ledger = QuotaLedger::from_snapshot(self.config.policy.clone(), &snapshot, &tasks);
        block.quota_exceeded =
            ledger.would_exceed(domain, block.day(), block.duration_minutes() as u32);

        self.db.create_block(&block)?;
        Ok(block)
    }

    /// Fetch a block.
    pub fn get_block(&self, block_id: &str) -> Result<TimeBlock> {
        self.db.get_block(block_id)
    }

    /// Blocks for one calendar day.
    pub fn blocks_for_day(&self, day: NaiveDate) -> Result<Vec<TimeBlock>> {
        self.db.blocks_for_day(day)
    }

    /// Cancel a time block. Blocks are never deleted; cancellation
    /// excludes them from conflict and quota computation. A linked task
    /// returns to pending in the same transaction, but only while the
    /// block is still the one the task points at.
    pub fn cancel_time_block(&mut self, block_id: &str) -> Result<()> {
        let mut block = self.db.get_block(block_id)?;
        if matches!(block.status, BlockStatus::Cancelled | BlockStatus::Completed) {
            return Err(ValidationError::InvalidValue {
                field: "block_status".to_string(),
                message: format!(
                    "block {} is {}, only planned or active blocks can be cancelled",
                    block.id, block.status
                ),
            }
            .into());
        }
        let block_version = block.version;
        block.status = BlockStatus::Cancelled;
        block.touch();

        match block.linked_task_id.clone() {
            Some(task_id) => {
                let mut task = self.db.get_task(&task_id)?;
                if task.linked_time_block_id.as_deref() == Some(block.id.as_str()) {
                    let task_version = task.version;
                    task.transition_to(TaskStatus::Pending)?;
                    self.db.commit_block_and_task(
                        &block,
                        block_version,
                        Some((&task, task_version)),
                    )?;
                } else {
                    // The task has moved on to another block; leave it alone.
                    self.db.commit_block_and_task(&block, block_version, None)?;
                }
            }
            None => self
                .db
                .commit_block_and_task(&block, block_version, None)?,
        }
        Ok(())
    }

    /// Rate a completed block's productivity, 1-5.
    pub fn rate_block(&mut self, block_id: &str, rating: u8) -> Result<TimeBlock> {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::InvalidValue {
                field: "productivity_rating".to_string(),
                message: format!("must be between 1 and 5, got {rating}"),
            }
            .into());
        }
        let mut block = self.db.get_block(block_id)?;
        let version = block.version;
        block.productivity_rating = Some(rating);
        block.touch();
        self.db.update_block(&block, version)?;
        Ok(block)
    }

    // === Day-level operations ===

    /// Propose an optimized arrangement for a day's planned blocks.
    /// Nothing is mutated; pass the result to [`Engine::apply_optimization`].
    pub fn optimize_day(&self, day: NaiveDate) -> Result<OptimizationResult> {
        let blocks = self.db.list_blocks()?;
        let tasks = self.db.list_tasks(None, None)?;
        let optimizer = ScheduleOptimizer::with_parts(
            self.config.windows,
            self.scorer.clone(),
            self.config.policy.clone(),
        );
        Ok(optimizer.optimize(day, &blocks, &tasks))
    }

    /// Commit an optimization proposal: every moved block is re-placed in
    /// one transaction. Returns the number of blocks moved. Fails with a
    /// concurrency error if any block changed since the proposal.
    pub fn apply_optimization(&mut self, result: &OptimizationResult) -> Result<u32> {
        let day_end = result
            .day
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        let mut updates = Vec::new();
        for placement in result.moves() {
            if placement.new_start.date_naive() != result.day
                || day_end.is_some_and(|end| placement.new_end > end)
            {
                return Err(ValidationError::CrossesMidnight {
                    start: placement.new_start,
                    end: placement.new_end,
                }
                .into());
            }
            let mut block = self.db.get_block(&placement.block_id)?;
            if block.status != BlockStatus::Planned {
                // The block started or finished since the proposal.
                return Err(ValidationError::InvalidValue {
                    field: "block_status".to_string(),
                    message: format!(
                        "block {} is {}, only planned blocks can be moved",
                        block.id, block.status
                    ),
                }
                .into());
            }
            let version = block.version;
            block.shift_to(placement.new_start);
            block.quota_exceeded = placement.quota_exceeded;
            updates.push((block, version));
        }
        let moved = updates.len() as u32;
        self.db.commit_placements(&updates)?;
        Ok(moved)
    }

    /// Quota status for one domain/day.
    pub fn get_quota(&self, domain: Domain, day: NaiveDate) -> Result<QuotaStatus> {
        let blocks = self.db.list_blocks()?;
        let tasks = self.db.list_tasks(None, None)?;
        let ledger = QuotaLedger::from_snapshot(self.config.policy.clone(), &blocks, &tasks);
        Ok(ledger.status(domain, day))
    }

    /// Quality metrics for a day's arrangement.
    pub fn day_quality(&self, day: NaiveDate) -> Result<ScheduleQuality> {
        let blocks = self.db.list_blocks()?;
        Ok(quality::assess(day, &blocks, &self.config.policy))
    }
}

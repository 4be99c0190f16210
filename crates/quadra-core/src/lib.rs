//! # Quadra Core Library
//!
//! This library provides the core scheduling logic for Quadra, a personal
//! time-allocation engine that places tasks into non-overlapping time blocks
//! across four life domains (academic, income, growth, life) under soft
//! daily quotas. It implements a CLI-first philosophy where all operations
//! are available via a standalone CLI binary over the same core library.
//!
//! ## Architecture
//!
//! - **Engine**: The exposed operation surface tying allocation, conflict
//!   detection, quotas, and optimization to SQLite storage under optimistic
//!   concurrency
//! - **Allocator**: Earliest-fit placement of tasks into free slots inside
//!   per-domain working windows, over a bounded look-ahead horizon
//! - **Optimizer**: Same-day repacking of planned blocks to cut domain
//!   switches, ordered by priority score
//! - **Storage**: SQLite-based task/block persistence and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`Engine`]: Scheduling operations over a database
//! - [`SlotAllocator`]: Earliest-fit slot search
//! - [`ScheduleOptimizer`]: Day-level repacking proposals
//! - [`QuotaLedger`]: Per-domain per-day consumption tracking
//! - [`Config`]: Application configuration management

pub mod allocator;
pub mod block;
pub mod conflict;
pub mod domain;
pub mod engine;
pub mod error;
pub mod optimizer;
pub mod quality;
pub mod quota;
pub mod scoring;
pub mod storage;
pub mod task;
pub mod window;

pub use allocator::{AllocationOutcome, AllocatorConfig, SlotAllocator};
pub use block::{BlockStatus, TimeBlock};
pub use conflict::ConflictDetector;
pub use domain::Domain;
pub use engine::{Engine, EngineConfig};
pub use error::{
    ConcurrencyError, ConfigError, ConflictError, CoreError, DatabaseError, NoFeasibleSlotError,
    Result, ValidationError,
};
pub use optimizer::{BlockPlacement, OptimizationResult, ScheduleOptimizer};
pub use quality::ScheduleQuality;
pub use quota::{QuotaLedger, QuotaPolicy, QuotaStatus};
pub use scoring::{PriorityScorer, ScoreWeights};
pub use storage::{Config, ScheduleDb};
pub use task::{ClassifiedInput, Task, TaskStatus};
pub use window::{WorkingHours, WorkingWindow};

//! Core error types for quadra-core.
//!
//! The taxonomy distinguishes four caller-visible failure classes:
//! validation (never retried), conflicts (caller picks another time),
//! infeasible allocation (look-ahead exhausted), and concurrency (caller
//! re-reads and retries). Quota overrun is deliberately absent: it is a
//! soft flag on successful results, not an error.

use std::path::PathBuf;
use thiserror::Error;

use chrono::{DateTime, Utc};

use crate::task::TaskStatus;

/// Core error type for quadra-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input; never retried automatically.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A requested interval overlaps existing planned/active blocks.
    #[error("Conflict error: {0}")]
    Conflict(#[from] ConflictError),

    /// The allocator exhausted its look-ahead window.
    #[error("Allocation error: {0}")]
    NoFeasibleSlot(#[from] NoFeasibleSlotError),

    /// Optimistic concurrency check failed; re-fetch and retry.
    #[error("Concurrency error: {0}")]
    Concurrency(#[from] ConcurrencyError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Estimated or block duration must be strictly positive.
    #[error("Duration must be positive, got {minutes} minutes")]
    NonPositiveDuration { minutes: i64 },

    /// end must be strictly greater than start.
    #[error("Invalid time range: end ({end}) must be after start ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Blocks are keyed by the calendar day of their start and may not
    /// span midnight.
    #[error("Time block [{start}, {end}) crosses midnight")]
    CrossesMidnight {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Priority is an integer 1-5 (1 = highest).
    #[error("Priority must be between 1 and 5, got {value}")]
    PriorityOutOfRange { value: i64 },

    /// Fractional score inputs must lie in [0, 1].
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Task status does not permit the requested operation.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// Operation requires a task in a particular status.
    #[error("Task {id} is {status}, expected {expected}")]
    UnexpectedStatus {
        id: String,
        status: TaskStatus,
        expected: TaskStatus,
    },
}

/// A manual time-block request overlapped existing planned/active blocks.
///
/// Carries the conflicting ids so the caller can choose another time.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Interval [{start}, {end}) conflicts with {} existing block(s): {}", conflicting_ids.len(), conflicting_ids.join(", "))]
pub struct ConflictError {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub conflicting_ids: Vec<String>,
}

/// The allocator found no free interval within its look-ahead bound.
///
/// Reported, never retried automatically; the task stays pending.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No feasible slot for task {task_id} within {look_ahead_days} days")]
pub struct NoFeasibleSlotError {
    pub task_id: String,
    pub look_ahead_days: u32,
}

/// A write carried a stale version; the caller must re-read and retry.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Version mismatch writing {record} {id}: expected version {expected_version}")]
pub struct ConcurrencyError {
    pub record: &'static str,
    pub id: String,
    pub expected_version: i64,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Record lookup by id came back empty
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::QueryFailed(err.to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

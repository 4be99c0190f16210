//! Task records and the task status machine.
//!
//! Tasks arrive from the external classifier as [`ClassifiedInput`] — an
//! already-typed tuple of title, domain, estimate, and optional AI hints.
//! This module owns the status machine and the version counter; every
//! mutation bumps `version` so the storage layer can apply optimistic
//! concurrency control.
//!
//! Valid transitions:
//! - pending → scheduled (allocator links a time block)
//! - pending → cancelled | deferred
//! - scheduled → in_progress | completed | cancelled | deferred | pending
//! - in_progress → completed | cancelled | deferred
//! - deferred → pending (re-activation)
//! - completed / cancelled are terminal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::Domain;
use crate::error::ValidationError;

/// Task status enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Awaiting allocation (initial state).
    Pending,
    /// Linked to a planned time block.
    Scheduled,
    /// Its time block is active.
    InProgress,
    /// Finished; actual minutes recorded (terminal).
    Completed,
    /// Abandoned (terminal).
    Cancelled,
    /// Pushed out of the current plan; can be re-activated.
    Deferred,
}

impl TaskStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &TaskStatus) -> bool {
        match self {
            TaskStatus::Pending => matches!(
                to,
                TaskStatus::Scheduled | TaskStatus::Cancelled | TaskStatus::Deferred
            ),
            TaskStatus::Scheduled => matches!(
                to,
                TaskStatus::InProgress
                    | TaskStatus::Completed
                    | TaskStatus::Cancelled
                    | TaskStatus::Deferred
                    | TaskStatus::Pending
            ),
            TaskStatus::InProgress => matches!(
                to,
                TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::Deferred
            ),
            TaskStatus::Deferred => matches!(to, TaskStatus::Pending),
            TaskStatus::Completed | TaskStatus::Cancelled => false,
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Stable snake_case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Deferred => "deferred",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the external AI classifier, consumed as already-typed input.
///
/// The core never parses free text; it validates this tuple and turns it
/// into a [`Task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedInput {
    pub title: String,
    pub domain: Domain,
    pub estimated_minutes: u32,
    /// Explicit priority 1-5 (1 = highest); defaults to 3 when absent.
    pub priority_hint: Option<u8>,
    /// Complexity adjustment in [0, 1]; defaults to 0.5 when absent.
    pub ai_complexity_score: Option<f64>,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
}

impl ClassifiedInput {
    /// Validate bounds on the classifier tuple.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.estimated_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration { minutes: 0 });
        }
        if let Some(priority) = self.priority_hint {
            if !(1..=5).contains(&priority) {
                return Err(ValidationError::PriorityOutOfRange {
                    value: priority as i64,
                });
            }
        }
        if let Some(score) = self.ai_complexity_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ValidationError::InvalidValue {
                    field: "ai_complexity_score".to_string(),
                    message: format!("must be in [0, 1], got {score}"),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::InvalidValue {
                field: "confidence".to_string(),
                message: format!("must be in [0, 1], got {}", self.confidence),
            });
        }
        Ok(())
    }
}

/// A discrete unit of work belonging to one life domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title
    pub title: String,
    /// Life domain the task belongs to
    pub domain: Domain,
    /// Priority 1-5 (1 = highest)
    pub priority: u8,
    /// Current status
    pub status: TaskStatus,
    /// Estimated duration in minutes (> 0)
    pub estimated_minutes: u32,
    /// Actual duration in minutes, set on completion
    pub actual_minutes: Option<u32>,
    /// Optional deadline
    pub due_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Monotonic version, incremented on every mutation
    pub version: i64,
    /// Cached priority score from the scorer at allocation time
    pub ai_priority_score: Option<f64>,
    /// Complexity adjustment supplied by the classifier, in [0, 1]
    pub ai_complexity_score: Option<f64>,
    /// Id of the currently linked non-terminal time block, if any
    pub linked_time_block_id: Option<String>,
    /// Set when allocation pushed the domain past its soft quota
    #[serde(default)]
    pub quota_exceeded: bool,
}

impl Task {
    /// Create a pending task from a validated classifier tuple.
    pub fn from_input(input: ClassifiedInput) -> Result<Self, ValidationError> {
        input.validate()?;
        let now = Utc::now();
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            domain: input.domain,
            priority: input.priority_hint.unwrap_or(3),
            status: TaskStatus::Pending,
            estimated_minutes: input.estimated_minutes,
            actual_minutes: None,
            due_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
            ai_priority_score: None,
            ai_complexity_score: input.ai_complexity_score,
            linked_time_block_id: None,
            quota_exceeded: false,
        })
    }

    /// Convenience constructor for direct task creation.
    pub fn new(title: impl Into<String>, domain: Domain, estimated_minutes: u32) -> Self {
        let now = Utc::now();
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            domain,
            priority: 3,
            status: TaskStatus::Pending,
            estimated_minutes,
            actual_minutes: None,
            due_at: None,
            created_at: now,
            updated_at: now,
            version: 1,
            ai_priority_score: None,
            ai_complexity_score: None,
            linked_time_block_id: None,
            quota_exceeded: false,
        }
    }

    /// Bump version and updated_at; call after any field mutation.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Transition to a new status, updating lifecycle fields.
    ///
    /// Returns an error if the transition is invalid. On success the
    /// version is bumped.
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(&new_status) {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to: new_status,
            });
        }

        match new_status {
            TaskStatus::Pending | TaskStatus::Cancelled | TaskStatus::Deferred => {
                // Leaving the schedule releases the block link.
                self.linked_time_block_id = None;
                self.quota_exceeded = false;
            }
            TaskStatus::Completed => {
                self.linked_time_block_id = None;
            }
            TaskStatus::Scheduled | TaskStatus::InProgress => {}
        }

        self.status = new_status;
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> ClassifiedInput {
        ClassifiedInput {
            title: "Write thesis chapter".to_string(),
            domain: Domain::Academic,
            estimated_minutes: 90,
            priority_hint: Some(2),
            ai_complexity_score: Some(0.7),
            confidence: 0.9,
        }
    }

    #[test]
    fn status_default_is_pending() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn status_valid_transitions() {
        assert!(TaskStatus::Pending.can_transition_to(&TaskStatus::Scheduled));
        assert!(TaskStatus::Pending.can_transition_to(&TaskStatus::Deferred));
        assert!(!TaskStatus::Pending.can_transition_to(&TaskStatus::Completed));
        assert!(!TaskStatus::Pending.can_transition_to(&TaskStatus::InProgress));

        assert!(TaskStatus::Scheduled.can_transition_to(&TaskStatus::InProgress));
        assert!(TaskStatus::Scheduled.can_transition_to(&TaskStatus::Pending)); // block cancelled
        assert!(TaskStatus::InProgress.can_transition_to(&TaskStatus::Completed));
        assert!(!TaskStatus::InProgress.can_transition_to(&TaskStatus::Scheduled));

        assert!(TaskStatus::Deferred.can_transition_to(&TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_transition_to(&TaskStatus::Pending)); // terminal
        assert!(!TaskStatus::Cancelled.can_transition_to(&TaskStatus::Pending)); // terminal
    }

    #[test]
    fn from_input_builds_pending_task() {
        let task = Task::from_input(sample_input()).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, 2);
        assert_eq!(task.estimated_minutes, 90);
        assert_eq!(task.version, 1);
        assert_eq!(task.ai_complexity_score, Some(0.7));
        assert!(task.linked_time_block_id.is_none());
    }

    #[test]
    fn from_input_defaults_priority_to_three() {
        let mut input = sample_input();
        input.priority_hint = None;
        let task = Task::from_input(input).unwrap();
        assert_eq!(task.priority, 3);
    }

    #[test]
    fn input_rejects_zero_duration() {
        let mut input = sample_input();
        input.estimated_minutes = 0;
        assert!(matches!(
            input.validate(),
            Err(ValidationError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn input_rejects_priority_out_of_range() {
        let mut input = sample_input();
        input.priority_hint = Some(6);
        assert!(matches!(
            input.validate(),
            Err(ValidationError::PriorityOutOfRange { value: 6 })
        ));
    }

    #[test]
    fn input_rejects_confidence_out_of_range() {
        let mut input = sample_input();
        input.confidence = 1.5;
        assert!(input.validate().is_err());
    }

    #[test]
    fn transition_bumps_version() {
        let mut task = Task::from_input(sample_input()).unwrap();
        assert_eq!(task.version, 1);
        task.transition_to(TaskStatus::Scheduled).unwrap();
        assert_eq!(task.version, 2);
        assert_eq!(task.status, TaskStatus::Scheduled);
    }

    #[test]
    fn invalid_transition_leaves_task_unchanged() {
        let mut task = Task::from_input(sample_input()).unwrap();
        let result = task.transition_to(TaskStatus::Completed);
        assert!(result.is_err());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.version, 1);
    }

    #[test]
    fn cancelling_releases_block_link() {
        let mut task = Task::from_input(sample_input()).unwrap();
        task.transition_to(TaskStatus::Scheduled).unwrap();
        task.linked_time_block_id = Some("block-1".to_string());
        task.quota_exceeded = true;
        task.transition_to(TaskStatus::Cancelled).unwrap();
        assert!(task.linked_time_block_id.is_none());
        assert!(!task.quota_exceeded);
    }

    #[test]
    fn task_serialization_roundtrip() {
        let task = Task::from_input(sample_input()).unwrap();
        let json = serde_json::to_string(&task).unwrap();
        let decoded: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.id, task.id);
        assert_eq!(decoded.domain, Domain::Academic);
        assert_eq!(decoded.status, TaskStatus::Pending);
    }
}

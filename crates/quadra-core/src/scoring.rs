//! Task priority scoring.
//!
//! Converts task attributes into a comparable ranking score: a weighted
//! sum of explicit priority (inverted so priority 1 scores highest),
//! deadline urgency, and the classifier's complexity adjustment. Scoring
//! is a deterministic pure function of the task and a reference instant;
//! ties are broken by earliest due date, then by earliest creation time,
//! so repeated sorts over unchanged inputs are byte-identical.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::ConfigError;
use crate::task::Task;

/// Hours in the urgency ramp: a due date 168h (one week) out scores 0.
const URGENCY_HORIZON_HOURS: f64 = 168.0;

/// Default complexity adjustment when the classifier supplied none.
const DEFAULT_COMPLEXITY: f64 = 0.5;

/// Weights for the scoring terms. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    /// Weight for explicit priority (default 0.5)
    pub priority_weight: f64,
    /// Weight for deadline urgency (default 0.3)
    pub urgency_weight: f64,
    /// Weight for classifier complexity (default 0.2)
    pub complexity_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            priority_weight: 0.5,
            urgency_weight: 0.3,
            complexity_weight: 0.2,
        }
    }
}

impl ScoreWeights {
    /// Validate at configuration time: each weight in [0, 1], sum 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("priority_weight", self.priority_weight),
            ("urgency_weight", self.urgency_weight),
            ("complexity_weight", self.complexity_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be in [0, 1], got {value}"),
                });
            }
        }
        let sum = self.priority_weight + self.urgency_weight + self.complexity_weight;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::InvalidValue {
                key: "scoring".to_string(),
                message: format!("weights must sum to 1, got {sum}"),
            });
        }
        Ok(())
    }
}

/// Priority scorer with configurable weights.
#[derive(Debug, Clone)]
pub struct PriorityScorer {
    weights: ScoreWeights,
}

impl PriorityScorer {
    /// Scorer with default weights (0.5 / 0.3 / 0.2).
    pub fn new() -> Self {
        Self {
            weights: ScoreWeights::default(),
        }
    }

    /// Scorer with validated custom weights.
    pub fn with_weights(weights: ScoreWeights) -> Result<Self, ConfigError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Score a task relative to `now`. Pure and deterministic: identical
    /// inputs yield the identical float.
    pub fn score(&self, task: &Task, now: DateTime<Utc>) -> f64 {
        let priority_term = (6 - task.priority.clamp(1, 5)) as f64 / 5.0;
        let urgency_term = Self::urgency(task.due_at, now);
        let complexity_term = task.ai_complexity_score.unwrap_or(DEFAULT_COMPLEXITY);

        self.weights.priority_weight * priority_term
            + self.weights.urgency_weight * urgency_term
            + self.weights.complexity_weight * complexity_term
    }

    /// Urgency in [0, 1]: 1 with no due date, otherwise a linear ramp
    /// from 1 (due now or overdue) down to 0 at one week out.
    fn urgency(due_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        match due_at {
            None => 1.0,
            Some(due) => {
                let hours_until_due = (due - now).num_minutes() as f64 / 60.0;
                (1.0 - hours_until_due / URGENCY_HORIZON_HOURS).clamp(0.0, 1.0)
            }
        }
    }

    /// Total ordering for scheduling: score descending, then earliest
    /// due date (tasks with a deadline before tasks without), then
    /// earliest creation time, then id for full determinism.
    pub fn compare(&self, a: &Task, b: &Task, now: DateTime<Utc>) -> Ordering {
        self.score(b, now)
            .total_cmp(&self.score(a, now))
            .then_with(|| match (a.due_at, b.due_at) {
                (Some(da), Some(db)) => da.cmp(&db),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Sort tasks into scheduling order.
    pub fn sort(&self, tasks: &mut [Task], now: DateTime<Utc>) {
        tasks.sort_by(|a, b| self.compare(a, b, now));
    }

    /// The configured weights.
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}

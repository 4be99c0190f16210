//! Task management commands for CLI.

use clap::Subcommand;
use quadra_core::task::ClassifiedInput;
use quadra_core::{Domain, Engine, TaskStatus};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Life domain: academic, income, growth, life
        #[arg(long)]
        domain: Domain,
        /// Estimated duration in minutes
        #[arg(long)]
        minutes: u32,
        /// Priority 1 (highest) to 5 (lowest); default 3
        #[arg(long)]
        priority: Option<u8>,
        /// Complexity score in [0, 1] from the classifier
        #[arg(long)]
        complexity: Option<f64>,
        /// Classifier confidence in [0, 1]; default 1.0
        #[arg(long, default_value = "1.0")]
        confidence: f64,
    },
    /// List tasks
    List {
        /// Filter by status (pending, scheduled, in_progress, completed, cancelled, deferred)
        #[arg(long)]
        status: Option<String>,
        /// Filter by domain
        #[arg(long)]
        domain: Option<Domain>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Allocate a time block for a pending task
    Allocate {
        /// Task ID
        id: String,
    },
    /// Start a scheduled task
    Start {
        /// Task ID
        id: String,
    },
    /// Complete a task
    Complete {
        /// Task ID
        id: String,
        /// Actual minutes spent (defaults to the estimate)
        #[arg(long)]
        actual_minutes: Option<u32>,
    },
    /// Defer a task out of the current plan
    Defer {
        /// Task ID
        id: String,
    },
    /// Re-activate a deferred task
    Reactivate {
        /// Task ID
        id: String,
    },
    /// Cancel a task
    Cancel {
        /// Task ID
        id: String,
    },
}

fn parse_status(s: &str) -> Result<TaskStatus, Box<dyn std::error::Error>> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "scheduled" => Ok(TaskStatus::Scheduled),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        "deferred" => Ok(TaskStatus::Deferred),
        other => Err(format!("unknown status: {other}").into()),
    }
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::open()?;

    match action {
        TaskAction::Create {
            title,
            domain,
            minutes,
            priority,
            complexity,
            confidence,
        } => {
            let task = engine.create_task(ClassifiedInput {
                title,
                domain,
                estimated_minutes: minutes,
                priority_hint: priority,
                ai_complexity_score: complexity,
                confidence,
            })?;
            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::List { status, domain } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            let tasks = engine.list_tasks(status, domain)?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        TaskAction::Get { id } => {
            let task = engine.get_task(&id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Allocate { id } => {
            let block = engine.allocate(&id)?;
            println!(
                "Task scheduled: {} [{} - {}]",
                id, block.start_time, block.end_time
            );
            if block.quota_exceeded {
                println!(
                    "warning: {} quota exceeded on {}",
                    block.domain,
                    block.day()
                );
            }
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        TaskAction::Start { id } => {
            let task = engine.start_task(&id)?;
            println!("Task started: {}", task.id);
        }
        TaskAction::Complete { id, actual_minutes } => {
            let task = engine.complete_task(&id, actual_minutes)?;
            println!(
                "Task completed: {} ({} min)",
                task.id,
                task.actual_minutes.unwrap_or(task.estimated_minutes)
            );
        }
        TaskAction::Defer { id } => {
            let task = engine.defer_task(&id)?;
            println!("Task deferred: {}", task.id);
        }
        TaskAction::Reactivate { id } => {
            let task = engine.reactivate_task(&id)?;
            println!("Task reactivated: {}", task.id);
        }
        TaskAction::Cancel { id } => {
            let task = engine.cancel_task(&id)?;
            println!("Task cancelled: {}", task.id);
        }
    }
    Ok(())
}

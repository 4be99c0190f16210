//! Day-level scheduling commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use quadra_core::Engine;

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Show a day's blocks in chronological order
    Show {
        /// Day, YYYY-MM-DD (defaults to today)
        date: Option<NaiveDate>,
    },
    /// Propose (and optionally apply) an optimized arrangement for a day
    Optimize {
        /// Day, YYYY-MM-DD (defaults to today)
        date: Option<NaiveDate>,
        /// Commit the proposal instead of just printing it
        #[arg(long)]
        apply: bool,
    },
    /// Quality metrics for a day's arrangement
    Quality {
        /// Day, YYYY-MM-DD (defaults to today)
        date: Option<NaiveDate>,
    },
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::open()?;

    match action {
        ScheduleAction::Show { date } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let blocks = engine.blocks_for_day(day)?;
            if blocks.is_empty() {
                println!("no blocks on {day}");
                return Ok(());
            }
            for block in &blocks {
                let link = block
                    .linked_task_id
                    .as_deref()
                    .map(|id| format!(" task={id}"))
                    .unwrap_or_default();
                let flag = if block.quota_exceeded { " [over quota]" } else { "" };
                println!(
                    "{} - {}  {:8}  {:9}  {}{}{}",
                    block.start_time.format("%H:%M"),
                    block.end_time.format("%H:%M"),
                    block.domain.to_string(),
                    block.status.to_string(),
                    block.id,
                    link,
                    flag,
                );
            }
        }
        ScheduleAction::Optimize { date, apply } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let result = engine.optimize_day(day)?;
            println!(
                "switches: {} -> {}",
                result.switches_before, result.switches_after
            );
            if result.is_noop() {
                println!("schedule already optimal for {day}");
                return Ok(());
            }
            for placement in result.moves() {
                println!(
                    "{}  {} -> {}  ({})",
                    placement.block_id,
                    placement.old_start.format("%H:%M"),
                    placement.new_start.format("%H:%M"),
                    placement.domain,
                );
            }
            if apply {
                let moved = engine.apply_optimization(&result)?;
                println!("applied: {moved} blocks moved");
            } else {
                println!("dry run; pass --apply to commit");
            }
        }
        ScheduleAction::Quality { date } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let quality = engine.day_quality(day)?;
            println!("{}", serde_json::to_string_pretty(&quality)?);
        }
    }
    Ok(())
}

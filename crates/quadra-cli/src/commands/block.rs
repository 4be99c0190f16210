//! Time block management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use quadra_core::{Domain, Engine};

#[derive(Subcommand)]
pub enum BlockAction {
    /// Create a manual time block
    Create {
        /// Start time, RFC 3339 (e.g. 2026-03-02T10:00:00Z)
        start: DateTime<Utc>,
        /// End time, RFC 3339; must fall on the same day as start
        end: DateTime<Utc>,
        /// Life domain: academic, income, growth, life
        #[arg(long)]
        domain: Domain,
        /// Task ID to link
        #[arg(long)]
        task_id: Option<String>,
    },
    /// List blocks for a day
    List {
        /// Day, YYYY-MM-DD (defaults to today)
        date: Option<chrono::NaiveDate>,
    },
    /// Get block details
    Get {
        /// Block ID
        id: String,
    },
    /// Cancel a block, releasing its slot and quota
    Cancel {
        /// Block ID
        id: String,
    },
    /// Rate a block's productivity, 1-5
    Rate {
        /// Block ID
        id: String,
        /// Rating
        rating: u8,
    },
}

pub fn run(action: BlockAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::open()?;

    match action {
        BlockAction::Create {
            start,
            end,
            domain,
            task_id,
        } => {
            let block = engine.create_block(start, end, domain, task_id.as_deref())?;
            println!("Block created: {}", block.id);
            if block.quota_exceeded {
                println!(
                    "warning: {} quota exceeded on {}",
                    block.domain,
                    block.day()
                );
            }
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        BlockAction::List { date } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let blocks = engine.blocks_for_day(day)?;
            println!("{}", serde_json::to_string_pretty(&blocks)?);
        }
        BlockAction::Get { id } => {
            let block = engine.get_block(&id)?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        BlockAction::Cancel { id } => {
            engine.cancel_time_block(&id)?;
            println!("Block cancelled: {id}");
        }
        BlockAction::Rate { id, rating } => {
            let block = engine.rate_block(&id, rating)?;
            println!("Block rated: {} -> {}", block.id, rating);
        }
    }
    Ok(())
}

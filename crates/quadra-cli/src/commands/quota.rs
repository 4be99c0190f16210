//! Quota status commands for CLI.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use quadra_core::{Domain, Engine};

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show quota status for a day
    Show {
        /// Day, YYYY-MM-DD (defaults to today)
        date: Option<NaiveDate>,
        /// Limit to a single domain
        #[arg(long)]
        domain: Option<Domain>,
    },
}

pub fn run(action: QuotaAction) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::open()?;

    match action {
        QuotaAction::Show { date, domain } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let domains: Vec<Domain> = match domain {
                Some(d) => vec![d],
                None => Domain::ORDER.to_vec(),
            };
            let statuses = domains
                .into_iter()
                .map(|d| engine.get_quota(d, day))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&statuses)?);
        }
    }
    Ok(())
}

//! Configuration commands for CLI.

use clap::Subcommand;
use quadra_core::{Config, Domain};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Print the config file path
    Path,
    /// Set a domain's daily quota in minutes
    SetQuota {
        /// Life domain: academic, income, growth, life
        domain: Domain,
        /// Soft quota in minutes
        minutes: u32,
    },
    /// Set a domain's working window
    SetWindow {
        /// Life domain: academic, income, growth, life
        domain: Domain,
        /// Window open, HH:MM
        open: String,
        /// Window close, HH:MM
        close: String,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::SetQuota { domain, minutes } => {
            let mut config = Config::load()?;
            match domain {
                Domain::Academic => config.quotas.academic_minutes = minutes,
                Domain::Income => config.quotas.income_minutes = minutes,
                Domain::Growth => config.quotas.growth_minutes = minutes,
                Domain::Life => config.quotas.life_minutes = minutes,
            }
            config.save()?;
            println!("{domain} quota set to {minutes} minutes");
        }
        ConfigAction::SetWindow {
            domain,
            open,
            close,
        } => {
            let mut config = Config::load()?;
            let window = match domain {
                Domain::Academic => &mut config.windows.academic,
                Domain::Income => &mut config.windows.income,
                Domain::Growth => &mut config.windows.growth,
                Domain::Life => &mut config.windows.life,
            };
            window.open = open;
            window.close = close;
            // Reject malformed windows before persisting.
            config.working_hours()?;
            config.save()?;
            println!("{domain} window updated");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

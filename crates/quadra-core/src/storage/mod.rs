mod config;
pub mod db;
pub mod migrations;

pub use config::Config;
pub use db::ScheduleDb;

use std::path::PathBuf;

/// Returns `~/.config/quadra[-dev]/` based on QUADRA_ENV.
///
/// Set QUADRA_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("QUADRA_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("quadra-dev")
    } else {
        base_dir.join("quadra")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

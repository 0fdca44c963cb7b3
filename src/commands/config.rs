//! Config command handler.

use crate::config::{config_path, load_config};
use crate::error::{KataError, Result};
use crate::output::{BOLD, GRAY, RESET};

/// Print the config file path and the effective configuration as TOML.
pub fn config_command() -> Result<()> {
    let config = load_config()?;
    let path = config_path()?;

    println!("{BOLD}# kata config{RESET}");
    println!("{GRAY}# {}{RESET}", path.display());
    println!(
        "{GRAY}# projects are stored in {}{RESET}",
        config.resolved_projects_dir()?.display()
    );
    println!();

    let toml = toml::to_string_pretty(&config)
        .map_err(|e| KataError::Config(format!("Failed to serialize config: {}", e)))?;
    print!("{}", toml);
    Ok(())
}

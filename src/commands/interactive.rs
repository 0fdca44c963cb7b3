//! Default command: the full-screen session.

use super::build_services;
use crate::config::load_config;
use crate::error::Result;
use crate::tui;

pub fn interactive_command() -> Result<()> {
    let config = load_config()?;
    let services = build_services(&config)?;
    tui::run(services)
}

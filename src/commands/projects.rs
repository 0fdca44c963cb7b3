//! Projects command handler.

use super::{build_services, require_credentials};
use crate::config::load_config;
use crate::error::Result;
use crate::output::print_projects;

/// List the catalog, marking downloaded projects.
pub fn projects_command() -> Result<()> {
    let config = load_config()?;
    let services = build_services(&config)?;
    require_credentials(&services)?;

    let projects = services.catalog.list_projects()?;
    let downloaded = services.registry.downloaded_ids()?;
    print_projects(&projects, &downloaded);
    Ok(())
}

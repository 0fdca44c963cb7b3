//! Downloads command handler.

use super::build_services;
use crate::config::load_config;
use crate::error::Result;
use crate::output::print_downloads;

/// List downloaded project ids.
///
/// Names come from the catalog when it can be reached; otherwise only ids are shown.
pub fn downloads_command() -> Result<()> {
    let config = load_config()?;
    let services = build_services(&config)?;
    let ids = services.registry.downloaded_ids()?;

    let projects = if ids.is_empty() || !services.tokens.has_credentials() {
        Vec::new()
    } else {
        match services.catalog.list_projects() {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(error = %e, "catalog unavailable, listing ids only");
                Vec::new()
            }
        }
    };

    print_downloads(&ids, &projects);
    Ok(())
}

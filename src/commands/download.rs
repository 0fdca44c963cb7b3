//! Download command handler.

use super::{build_services, require_credentials, resolve_variant};
use crate::cancel::CancelFlag;
use crate::config::load_config;
use crate::error::Result;
use crate::output::{print_success, print_warning, CloneProgressBar};

/// Clone a project variant and its harness, then record it as downloaded.
pub fn download_command(id: u64, variant: &str) -> Result<()> {
    let config = load_config()?;
    let services = build_services(&config)?;
    require_credentials(&services)?;

    let projects = services.catalog.list_projects()?;
    let (project, variant) = resolve_variant(&projects, id, variant)?;

    let cancel = CancelFlag::on_interrupt()?;
    let bar = CloneProgressBar::new(&format!("{} ({})", project.name, variant));
    let result = services.downloader.download_project(
        &project,
        &variant,
        &mut |progress| bar.update(&progress),
        &cancel,
    );
    let path = match result {
        Ok(path) => {
            bar.finish();
            path
        }
        Err(e) => {
            bar.abandon();
            return Err(e);
        }
    };

    services.registry.mark_downloaded(project.id)?;
    if let Err(e) = services.catalog.initialize_project(project.id) {
        tracing::warn!(project_id = project.id, error = %e, "project initialization failed");
        print_warning(&format!("Could not notify the catalog: {}", e));
    }

    print_success(&format!("Downloaded {} to {}", project.name, path.display()));
    Ok(())
}

//! CLI command handlers for kata.
//!
//! - [`interactive`] - Full-screen session (default)
//! - [`projects`] - List the catalog
//! - [`downloads`] - List downloaded projects
//! - [`download`] - Headless download
//! - [`test`] - Headless test run
//! - [`config`] - Show the configuration

mod config;
mod download;
mod downloads;
mod interactive;
mod projects;

pub use config::config_command;
pub use download::download_command;
pub use downloads::downloads_command;
pub use interactive::interactive_command;
pub use projects::projects_command;
pub use test::test_command;

use crate::auth::{CredentialStore, HttpTokenProvider, TokenProvider};
use crate::catalog::{find_project, CatalogClient, HttpCatalogClient, Project};
use crate::config::{credentials_path, registry_path, Config};
use crate::download::GitDownloader;
use crate::error::{KataError, Result};
use crate::registry::DownloadRegistry;
use crate::session::Services;
use crate::testrun::ContainerTestRunner;
use crate::workspace::Workspace;
use std::sync::Arc;

/// Wire the production collaborators from the configuration.
pub fn build_services(config: &Config) -> Result<Services> {
    let timeout = config.request_timeout();
    let workspace = Workspace::new(config.resolved_projects_dir()?);

    let tokens: Arc<dyn TokenProvider> = Arc::new(HttpTokenProvider::new(
        &config.api_url,
        timeout,
        CredentialStore::new(credentials_path()?),
    )?);
    let catalog: Arc<dyn CatalogClient> = Arc::new(HttpCatalogClient::new(
        &config.api_url,
        timeout,
        Arc::clone(&tokens),
    )?);

    Ok(Services {
        catalog,
        tokens,
        downloader: Arc::new(GitDownloader::new(workspace.clone(), &config.repo_base_url)),
        tests: Arc::new(ContainerTestRunner::new(
            workspace.clone(),
            config.test_command.clone(),
            config.report_max_age(),
        )),
        registry: DownloadRegistry::new(registry_path()?),
        workspace,
    })
}

/// Look up a project and check it is offered in `variant`.
///
/// Returns the project and the variant spelled as the catalog spells it.
fn resolve_variant(projects: &[Project], id: u64, variant: &str) -> Result<(Project, String)> {
    let project = find_project(projects, id)
        .ok_or_else(|| KataError::Catalog(format!("no project with id {}", id)))?;

    let wanted = variant.trim().to_lowercase();
    let variants = project.variants();
    match variants.iter().find(|v| v.to_lowercase() == wanted) {
        Some(found) => Ok((project.clone(), found.clone())),
        None => Err(KataError::Catalog(format!(
            "project {} ({}) has no '{}' variant; available: {}",
            id,
            project.name,
            variant,
            variants.join(", ")
        ))),
    }
}

/// Headless commands need stored credentials; the interactive session can log in.
fn require_credentials(services: &Services) -> Result<()> {
    if services.tokens.has_credentials() {
        Ok(())
    } else {
        Err(KataError::Auth(
            "not logged in; run `kata` to log in".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projects() -> Vec<Project> {
        vec![Project {
            id: 4,
            name: "Shell".to_string(),
            languages: "Rust, Go".to_string(),
            difficulty: String::new(),
            estimated_duration: String::new(),
            description: String::new(),
            access_tier: String::new(),
        }]
    }

    #[test]
    fn test_resolve_variant_is_case_insensitive() {
        let (project, variant) = resolve_variant(&projects(), 4, "rust").unwrap();
        assert_eq!(project.id, 4);
        assert_eq!(variant, "Rust");
    }

    #[test]
    fn test_resolve_variant_unknown_id() {
        let err = resolve_variant(&projects(), 9, "rust").unwrap_err();
        assert!(err.to_string().contains("no project with id 9"));
    }

    #[test]
    fn test_resolve_variant_lists_available() {
        let err = resolve_variant(&projects(), 4, "python").unwrap_err();
        assert!(err.to_string().contains("available: Rust, Go"));
    }
}

//! Project and download listings.

use super::colors::*;
use crate::catalog::Project;

/// Print the catalog, one line per project entry.
pub fn print_projects(projects: &[Project], downloaded: &[u64]) {
    if projects.is_empty() {
        println!("{GRAY}No projects available.{RESET}");
        return;
    }

    let id_width = projects
        .iter()
        .map(|p| p.id.to_string().len())
        .max()
        .unwrap_or(1);

    for project in projects {
        let marker = if downloaded.contains(&project.id) {
            format!("{GREEN}●{RESET}")
        } else {
            " ".to_string()
        };
        println!(
            "{} {BOLD}{:>width$}{RESET}  {}  {GRAY}[{}]{RESET}",
            marker,
            project.id,
            project.name,
            project.variants().join(", "),
            width = id_width
        );

        let mut details = Vec::new();
        if !project.difficulty.is_empty() {
            details.push(project.difficulty.clone());
        }
        if !project.estimated_duration.is_empty() {
            details.push(project.estimated_duration.clone());
        }
        if !project.access_tier.is_empty() {
            details.push(project.access_tier.clone());
        }
        if !details.is_empty() {
            println!(
                "  {:width$}  {DIM}{}{RESET}",
                "",
                details.join(" · "),
                width = id_width
            );
        }
    }
}

/// Print the download registry, resolving names from the catalog when known.
pub fn print_downloads(ids: &[u64], projects: &[Project]) {
    if ids.is_empty() {
        println!("{GRAY}No projects downloaded yet.{RESET}");
        println!();
        println!("Run {CYAN}kata download <id> --variant <variant>{RESET} to get started.");
        return;
    }

    for id in ids {
        match projects.iter().find(|p| p.id == *id) {
            Some(project) => println!("{GREEN}●{RESET} {BOLD}{}{RESET}  {}", id, project.name),
            None => println!("{GREEN}●{RESET} {BOLD}{}{RESET}", id),
        }
    }
}

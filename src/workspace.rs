//! Local project directories.

use crate::catalog::Project;
use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Workspace {
    projects_dir: PathBuf,
}

impl Workspace {
    pub fn new(projects_dir: PathBuf) -> Self {
        Self { projects_dir }
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// `<projects_dir>/<slug>_<id>`
    pub fn project_dir(&self, project: &Project) -> PathBuf {
        self.projects_dir
            .join(format!("{}_{}", project.slug(), project.id))
    }

    /// Hidden sibling holding the test harness: `<projects_dir>/.<slug>_<id>_tests`
    pub fn harness_dir(&self, project: &Project) -> PathBuf {
        self.projects_dir
            .join(format!(".{}_{}_tests", project.slug(), project.id))
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    pub fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// Remove a directory tree; an already-missing directory is fine.
    pub fn remove_dir(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Open `path` in the system file browser.
    ///
    /// Failures are logged and reported as `false`, never as errors.
    pub fn open_in_file_browser(&self, path: &Path) -> bool {
        let Some(mut command) = opener_command(std::env::consts::OS) else {
            tracing::warn!(os = std::env::consts::OS, "no file browser command for platform");
            return false;
        };
        match command.arg(path).spawn() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to open file browser");
                false
            }
        }
    }
}

fn opener_command(target_os: &str) -> Option<Command> {
    match target_os {
        "macos" => Some(Command::new("open")),
        "linux" | "freebsd" | "openbsd" | "netbsd" => Some(Command::new("xdg-open")),
        "windows" => Some(Command::new("explorer")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> Project {
        Project {
            id: 12,
            name: "Http Server".to_string(),
            languages: "rust".to_string(),
            difficulty: String::new(),
            estimated_duration: String::new(),
            description: String::new(),
            access_tier: String::new(),
        }
    }

    #[test]
    fn test_project_and_harness_paths() {
        let workspace = Workspace::new(PathBuf::from("/work"));
        assert_eq!(
            workspace.project_dir(&project()),
            PathBuf::from("/work/http_server_12")
        );
        assert_eq!(
            workspace.harness_dir(&project()),
            PathBuf::from("/work/.http_server_12_tests")
        );
    }

    #[test]
    fn test_create_and_remove_dir() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path().to_path_buf());
        let dir = workspace.project_dir(&project());

        assert!(!workspace.exists(&dir));
        workspace.create_dir(&dir.join("src")).unwrap();
        assert!(workspace.exists(&dir));

        workspace.remove_dir(&dir).unwrap();
        assert!(!workspace.exists(&dir));
        workspace.remove_dir(&dir).unwrap();
    }

    #[test]
    fn test_opener_command_per_platform() {
        assert_eq!(
            opener_command("macos").unwrap().get_program(),
            "open"
        );
        assert_eq!(
            opener_command("linux").unwrap().get_program(),
            "xdg-open"
        );
        assert_eq!(
            opener_command("windows").unwrap().get_program(),
            "explorer"
        );
        assert!(opener_command("plan9").is_none());
    }
}

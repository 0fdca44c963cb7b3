//! Project download: clones a project variant and its test harness.

mod progress;

pub use progress::{parse_line, CloneLine, CloneProgress, Phase, ProgressTracker, MAX_INTERMEDIATE};

use crate::cancel::CancelFlag;
use crate::catalog::Project;
use crate::error::{KataError, Result};
use crate::process::{run_streaming, Capture};
use crate::workspace::Workspace;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

const HARNESS_LABEL: &str = "Test harness";

pub trait ProjectDownloader: Send + Sync {
    /// Clone `variant` of `project` into the workspace, returning its directory.
    ///
    /// Any existing copy is replaced.
    fn download_project(
        &self,
        project: &Project,
        variant: &str,
        on_progress: &mut dyn FnMut(CloneProgress),
        cancel: &CancelFlag,
    ) -> Result<PathBuf>;
}

/// Downloads projects with the `git` command line.
pub struct GitDownloader {
    workspace: Workspace,
    repo_base_url: String,
    git: Vec<OsString>,
}

impl GitDownloader {
    pub fn new(workspace: Workspace, repo_base_url: &str) -> Self {
        Self {
            workspace,
            repo_base_url: repo_base_url.trim_end_matches('/').to_string(),
            git: vec![OsString::from("git")],
        }
    }

    /// Replace the `git` invocation with a program plus leading arguments.
    pub fn with_git_command(mut self, command: Vec<OsString>) -> Self {
        if !command.is_empty() {
            self.git = command;
        }
        self
    }

    pub fn project_url(&self, project: &Project, variant: &str) -> String {
        format!(
            "{}/{}-{}.git",
            self.repo_base_url,
            project.slug(),
            variant.trim().to_lowercase()
        )
    }

    pub fn harness_url(&self, project: &Project) -> String {
        format!("{}/{}-tests.git", self.repo_base_url, project.slug())
    }

    fn clone_command(&self, url: &str, dir: &Path) -> Command {
        let mut command = Command::new(&self.git[0]);
        command
            .args(&self.git[1..])
            .arg("clone")
            .arg("--progress")
            .arg(url)
            .arg(dir);
        command
    }

    fn clone_repo(
        &self,
        url: &str,
        dir: &Path,
        tracker: &mut ProgressTracker,
        harness: bool,
        on_progress: &mut dyn FnMut(CloneProgress),
        cancel: &CancelFlag,
    ) -> Result<()> {
        tracing::info!(url, dir = %dir.display(), "cloning");
        tracker.begin_clone();

        let mut on_line = |line: String| {
            let update = if harness {
                tracker.observe_label(&line, HARNESS_LABEL)
            } else {
                tracker.observe(&line)
            };
            if let Some(update) = update {
                on_progress(update);
            }
        };

        let status = run_streaming(
            self.clone_command(url, dir),
            Capture::StderrOnly,
            &mut on_line,
            cancel,
        )
        .map_err(|e| match e {
            KataError::Io(io) if io.kind() == ErrorKind::NotFound => {
                KataError::Clone(format!("git executable not found: {}", io))
            }
            other => other,
        })?;

        if !status.success() {
            let message = tracker.take_error().unwrap_or_else(|| match status.code() {
                Some(code) => format!("git clone of {} exited with code {}", url, code),
                None => format!("git clone of {} was terminated by a signal", url),
            });
            tracing::warn!(url, %message, "clone failed");
            return Err(KataError::Clone(message));
        }

        if !self.workspace.exists(dir) {
            return Err(KataError::Clone(format!(
                "git reported success but {} does not exist",
                dir.display()
            )));
        }

        Ok(())
    }
}

impl ProjectDownloader for GitDownloader {
    fn download_project(
        &self,
        project: &Project,
        variant: &str,
        on_progress: &mut dyn FnMut(CloneProgress),
        cancel: &CancelFlag,
    ) -> Result<PathBuf> {
        let project_dir = self.workspace.project_dir(project);
        let harness_dir = self.workspace.harness_dir(project);

        self.workspace.remove_dir(&project_dir)?;
        self.workspace.remove_dir(&harness_dir)?;
        self.workspace.create_dir(self.workspace.projects_dir())?;

        let mut tracker = ProgressTracker::new();
        let cloned = self
            .clone_repo(
                &self.project_url(project, variant),
                &project_dir,
                &mut tracker,
                false,
                on_progress,
                cancel,
            )
            .and_then(|()| cancel.check())
            .and_then(|()| {
                self.clone_repo(
                    &self.harness_url(project),
                    &harness_dir,
                    &mut tracker,
                    true,
                    on_progress,
                    cancel,
                )
            });

        // A project without its harness cannot be tested, so discard both.
        if let Err(e) = cloned {
            for dir in [&project_dir, &harness_dir] {
                if let Err(cleanup) = self.workspace.remove_dir(dir) {
                    tracing::warn!(dir = %dir.display(), error = %cleanup, "failed to remove partial clone");
                }
            }
            return Err(e);
        }

        on_progress(CloneProgress::finished());
        tracing::info!(project_id = project.id, variant, dir = %project_dir.display(), "download complete");
        Ok(project_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> Project {
        Project {
            id: 3,
            name: "Key Value Store".to_string(),
            languages: "rust, go".to_string(),
            difficulty: String::new(),
            estimated_duration: String::new(),
            description: String::new(),
            access_tier: String::new(),
        }
    }

    /// Downloader whose `git` is a shell script; the clone target is `$4`.
    fn fake_git(temp: &TempDir, script: &str) -> GitDownloader {
        let script_path = temp.path().join("fake-git.sh");
        fs::write(&script_path, script).unwrap();
        let workspace = Workspace::new(temp.path().join("projects"));
        GitDownloader::new(workspace, "https://git.example.com/kata/")
            .with_git_command(vec![OsString::from("sh"), script_path.into_os_string()])
    }

    #[test]
    fn test_repository_urls() {
        let temp = TempDir::new().unwrap();
        let downloader = GitDownloader::new(Workspace::new(temp.path().to_path_buf()), "https://git.example.com/kata/");

        assert_eq!(
            downloader.project_url(&project(), "Rust"),
            "https://git.example.com/kata/key_value_store-rust.git"
        );
        assert_eq!(
            downloader.harness_url(&project()),
            "https://git.example.com/kata/key_value_store-tests.git"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_download_reports_weighted_progress_and_finishes() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(
            &temp,
            r#"
printf "Cloning into '%s'...\n" "$4" >&2
printf "remote: Counting objects: 100%% (4/4), done.\n" >&2
printf "Receiving objects:  50%% (2/4)\r" >&2
printf "Receiving objects: 100%% (4/4), done.\n" >&2
printf "Resolving deltas: 100%% (1/1), done.\n" >&2
mkdir -p "$4"
"#,
        );
        let mut updates = Vec::new();

        let dir = downloader
            .download_project(&project(), "rust", &mut |p| updates.push(p), &CancelFlag::new())
            .unwrap();

        assert_eq!(dir, temp.path().join("projects").join("key_value_store_3"));
        assert!(dir.is_dir());
        assert!(temp.path().join("projects").join(".key_value_store_3_tests").is_dir());

        let fractions: Vec<f64> = updates.iter().map(|p| p.fraction).collect();
        assert!(fractions.iter().any(|f| (f - 0.4).abs() < 1e-9));
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.last(), Some(&1.0));
        assert!(fractions[..fractions.len() - 1].iter().all(|f| *f <= MAX_INTERMEDIATE));
        assert!(updates
            .iter()
            .any(|p| p.label.as_deref() == Some("Test harness: Receiving objects")));
    }

    #[cfg(unix)]
    #[test]
    fn test_download_replaces_existing_directory() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(&temp, "mkdir -p \"$4\"\n");
        let stale = temp.path().join("projects").join("key_value_store_3");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("old.txt"), "old").unwrap();

        downloader
            .download_project(&project(), "go", &mut |_| {}, &CancelFlag::new())
            .unwrap();

        assert!(stale.is_dir());
        assert!(!stale.join("old.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_download_failure_uses_git_diagnostic() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(
            &temp,
            "echo \"fatal: repository '$3' not found\" >&2\nexit 128\n",
        );

        let err = downloader
            .download_project(&project(), "rust", &mut |_| {}, &CancelFlag::new())
            .unwrap_err();

        match err {
            KataError::Clone(message) => {
                assert!(message.contains("fatal: repository"));
                assert!(message.contains("key_value_store-rust.git"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_download_failure_without_diagnostic_reports_exit_code() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(&temp, "exit 2\n");

        let err = downloader
            .download_project(&project(), "rust", &mut |_| {}, &CancelFlag::new())
            .unwrap_err();

        assert!(matches!(err, KataError::Clone(ref m) if m.contains("code 2")));
    }

    #[cfg(unix)]
    #[test]
    fn test_download_success_without_directory_is_error() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(&temp, "exit 0\n");
        let mut updates = Vec::new();

        let err = downloader
            .download_project(&project(), "rust", &mut |p| updates.push(p), &CancelFlag::new())
            .unwrap_err();

        assert!(matches!(err, KataError::Clone(ref m) if m.contains("does not exist")));
        assert!(updates.iter().all(|p| p.fraction < 1.0));
    }

    #[cfg(unix)]
    #[test]
    fn test_download_cancelled_leaves_no_directories() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(
            &temp,
            "mkdir -p \"$4\"\nprintf \"Cloning into '%s'...\\n\" \"$4\" >&2\nexec sleep 30\n",
        );
        let cancel = CancelFlag::new();
        let trigger = cancel.clone();
        let mut cancelled = false;

        let err = downloader
            .download_project(
                &project(),
                "rust",
                &mut |_| {
                    if !cancelled {
                        cancelled = true;
                        trigger.cancel();
                    }
                },
                &cancel,
            )
            .unwrap_err();

        assert!(matches!(err, KataError::Cancelled));
        let projects = temp.path().join("projects");
        assert!(!projects.join("key_value_store_3").exists());
        assert!(!projects.join(".key_value_store_3_tests").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_harness_failure_removes_project_directory() {
        let temp = TempDir::new().unwrap();
        let downloader = fake_git(
            &temp,
            r#"
case "$3" in
  *-tests.git) echo "fatal: harness missing" >&2; exit 128 ;;
esac
mkdir -p "$4"
echo "content" > "$4/main.rs"
"#,
        );

        let err = downloader
            .download_project(&project(), "rust", &mut |_| {}, &CancelFlag::new())
            .unwrap_err();

        assert!(matches!(err, KataError::Clone(ref m) if m.contains("harness missing")));
        let projects = temp.path().join("projects");
        assert!(!projects.join("key_value_store_3").exists());
        assert!(!projects.join(".key_value_store_3_tests").exists());
    }
}

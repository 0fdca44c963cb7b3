//! Test execution: runs the containerized harness and reads its report.

use crate::cancel::CancelFlag;
use crate::catalog::Project;
use crate::error::{KataError, Result};
use crate::process::{run_streaming, Capture};
use crate::report::{parse_report, TestRunReport};
use crate::workspace::Workspace;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};

const REPORTS_DIR: &str = "reports";

/// Output lines kept in the error when the harness itself fails.
const FAILURE_OUTPUT_LINES: usize = 20;

pub trait TestExecutor: Send + Sync {
    fn run_tests(
        &self,
        project: &Project,
        variant: &str,
        on_progress: &mut dyn FnMut(String),
        cancel: &CancelFlag,
    ) -> Result<TestRunReport>;
}

pub struct ContainerTestRunner {
    workspace: Workspace,
    command: Vec<String>,
    max_report_age: Duration,
}

impl ContainerTestRunner {
    pub fn new(workspace: Workspace, command: Vec<String>, max_report_age: Duration) -> Self {
        Self {
            workspace,
            command,
            max_report_age,
        }
    }

    /// Substitute `{project_dir}`, `{harness_dir}`, `{variant}` and `{slug}`.
    pub fn expand_command(&self, project: &Project, variant: &str) -> Vec<String> {
        let project_dir = self.workspace.project_dir(project);
        let harness_dir = self.workspace.harness_dir(project);
        let slug = project.slug();

        self.command
            .iter()
            .map(|arg| {
                arg.replace("{project_dir}", &project_dir.to_string_lossy())
                    .replace("{harness_dir}", &harness_dir.to_string_lossy())
                    .replace("{variant}", variant)
                    .replace("{slug}", &slug)
            })
            .collect()
    }
}

impl TestExecutor for ContainerTestRunner {
    fn run_tests(
        &self,
        project: &Project,
        variant: &str,
        on_progress: &mut dyn FnMut(String),
        cancel: &CancelFlag,
    ) -> Result<TestRunReport> {
        let project_dir = self.workspace.project_dir(project);
        if !self.workspace.exists(&project_dir) {
            return Err(KataError::ProjectNotFound(project_dir));
        }

        let args = self.expand_command(project, variant);
        let Some((program, rest)) = args.split_first() else {
            return Err(KataError::Config("test_command is empty".to_string()));
        };

        let mut command = Command::new(program);
        command
            .args(rest)
            .current_dir(&project_dir)
            .env("KATA_PROJECT_DIR", &project_dir)
            .env("KATA_VARIANT", variant);

        tracing::info!(project_id = project.id, variant, command = ?args, "running tests");

        let mut output: Vec<String> = Vec::new();
        let mut on_line = |line: String| {
            on_progress(line.clone());
            output.push(line);
        };
        let status = run_streaming(command, Capture::Both, &mut on_line, cancel).map_err(|e| {
            match e {
                KataError::Io(io) if io.kind() == ErrorKind::NotFound => {
                    KataError::TestRun(format!("'{}' not found: {}", program, io))
                }
                other => other,
            }
        })?;

        match status.code() {
            Some(0) => tracing::info!("tests passed"),
            Some(1) => tracing::info!("tests reported failures"),
            code => {
                let exit = code
                    .map(|c| format!("exited with code {}", c))
                    .unwrap_or_else(|| "was terminated by a signal".to_string());
                let start = output.len().saturating_sub(FAILURE_OUTPUT_LINES);
                return Err(KataError::TestRun(format!(
                    "test command {}\n{}",
                    exit,
                    output[start..].join("\n")
                )));
            }
        }

        let report_path = find_latest_report(&project_dir, variant)?;
        check_fresh(&report_path, self.max_report_age, SystemTime::now())?;

        let bytes = fs::read(&report_path)?;
        let report = parse_report(&bytes)?;
        tracing::info!(
            path = %report_path.display(),
            passed = report.passed_tests.len(),
            failed = report.failed_tests.len(),
            "parsed test report"
        );
        Ok(report)
    }
}

/// Newest `*.xml` across `reports/<variant>/` and `reports/`.
///
/// On equal modification times the variant directory wins.
pub fn find_latest_report(project_dir: &Path, variant: &str) -> Result<PathBuf> {
    let reports = project_dir.join(REPORTS_DIR);
    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for dir in [reports.join(variant), reports.clone()] {
        if let Some((modified, path)) = newest_xml(&dir)? {
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or(KataError::ReportNotFound(reports))
}

fn newest_xml(dir: &Path) -> Result<Option<(SystemTime, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_xml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);
        if !is_xml || !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest)
}

/// Reject reports last modified more than `max_age` before `now`.
pub fn check_fresh(path: &Path, max_age: Duration, now: SystemTime) -> Result<()> {
    let modified = fs::metadata(path)?.modified()?;
    // Clock skew can put mtime in the future; treat that as fresh.
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    if age > max_age {
        return Err(KataError::StaleReport {
            path: path.to_path_buf(),
            age_secs: age.as_secs(),
        });
    }
    Ok(())
}

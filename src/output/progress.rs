//! Progress indicators for headless downloads and test runs.

use crate::download::CloneProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const BAR_LENGTH: u64 = 1000;

/// Progress bar driven by clone progress updates.
pub struct CloneProgressBar {
    bar: ProgressBar,
}

impl CloneProgressBar {
    pub fn new(title: &str) -> Self {
        let bar = ProgressBar::new(BAR_LENGTH);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold} [{bar:40.green/white}] {percent:>3}% {msg:.dim}")
                .expect("invalid template")
                .progress_chars("█▓░"),
        );
        bar.set_prefix(title.to_string());
        Self { bar }
    }

    pub fn update(&self, progress: &CloneProgress) {
        let position = (progress.fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64).round() as u64;
        if position > self.bar.position() {
            self.bar.set_position(position);
        }
        if let Some(label) = &progress.label {
            self.bar.set_message(label.clone());
        }
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// Spinner showing the latest line of test output.
pub struct TestSpinner {
    spinner: ProgressBar,
}

impl TestSpinner {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars(SPINNER_CHARS)
                .template("{spinner:.cyan} Running tests {msg:.dim}")
                .expect("invalid template"),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    pub fn update(&self, line: &str) {
        self.spinner.set_message(line.trim().to_string());
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for TestSpinner {
    fn default() -> Self {
        Self::new()
    }
}

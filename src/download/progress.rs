//! Translation of `git clone --progress` diagnostics into a single fraction.
//!
//! Receiving (or unpacking) objects covers the first 80% of a clone and
//! resolving deltas the remaining 20%. Counting and compressing only
//! update the label.

use regex::Regex;
use std::sync::LazyLock;

const RECEIVE_WEIGHT: f64 = 0.8;
const RESOLVE_WEIGHT: f64 = 0.2;

/// Highest fraction reported before the download has fully finished.
pub const MAX_INTERMEDIATE: f64 = 0.99;

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})%").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct CloneProgress {
    /// Normalized completion in `[0, 1]`.
    pub fraction: f64,
    pub label: Option<String>,
}

impl CloneProgress {
    pub fn new(fraction: f64, label: Option<String>) -> Self {
        Self { fraction, label }
    }

    pub fn finished() -> Self {
        Self::new(1.0, Some("Done".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cloning,
    Counting,
    Compressing,
    Receiving,
    Unpacking,
    Resolving,
}

impl Phase {
    const MARKERS: [(&'static str, Phase); 6] = [
        ("Cloning into", Phase::Cloning),
        ("Counting objects", Phase::Counting),
        ("Compressing objects", Phase::Compressing),
        ("Receiving objects", Phase::Receiving),
        ("Unpacking objects", Phase::Unpacking),
        ("Resolving deltas", Phase::Resolving),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Cloning => "Cloning",
            Phase::Counting => "Counting objects",
            Phase::Compressing => "Compressing objects",
            Phase::Receiving => "Receiving objects",
            Phase::Unpacking => "Unpacking objects",
            Phase::Resolving => "Resolving deltas",
        }
    }

    /// Overall fraction for `percent` of this phase, if the phase is weighted.
    fn weighted(&self, percent: f64) -> Option<f64> {
        let local = (percent / 100.0).clamp(0.0, 1.0);
        match self {
            Phase::Receiving | Phase::Unpacking => Some(local * RECEIVE_WEIGHT),
            Phase::Resolving => Some(RECEIVE_WEIGHT + local * RESOLVE_WEIGHT),
            Phase::Cloning | Phase::Counting | Phase::Compressing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloneLine {
    Phase { phase: Phase, fraction: Option<f64> },
    Error(String),
    Other,
}

pub fn parse_line(line: &str) -> CloneLine {
    let trimmed = line.trim();
    if trimmed.contains("error:") || trimmed.contains("fatal:") {
        return CloneLine::Error(trimmed.to_string());
    }

    let Some(phase) = Phase::MARKERS
        .iter()
        .find(|(marker, _)| trimmed.contains(marker))
        .map(|(_, phase)| *phase)
    else {
        return CloneLine::Other;
    };

    let fraction = PERCENT
        .captures(trimmed)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .and_then(|percent| phase.weighted(percent));

    CloneLine::Phase { phase, fraction }
}

/// Folds parsed lines from one or more clones into monotonic progress.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    fraction: f64,
    error: Option<String>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the captured diagnostic before a new clone starts.
    pub fn begin_clone(&mut self) {
        self.error = None;
    }

    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Progress update for a line of the main repository clone.
    pub fn observe(&mut self, line: &str) -> Option<CloneProgress> {
        match parse_line(line) {
            CloneLine::Phase { phase, fraction } => {
                if let Some(fraction) = fraction {
                    self.fraction = self.fraction.max(fraction.min(MAX_INTERMEDIATE));
                }
                Some(CloneProgress::new(self.fraction, Some(phase.label().to_string())))
            }
            CloneLine::Error(message) => {
                self.error = Some(message);
                None
            }
            CloneLine::Other => None,
        }
    }

    /// Progress update for a line of the harness clone: label only.
    pub fn observe_label(&mut self, line: &str, prefix: &str) -> Option<CloneProgress> {
        match parse_line(line) {
            CloneLine::Phase { phase, .. } => Some(CloneProgress::new(
                self.fraction,
                Some(format!("{}: {}", prefix, phase.label())),
            )),
            CloneLine::Error(message) => {
                self.error = Some(message);
                None
            }
            CloneLine::Other => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn fraction_of(line: &str) -> Option<f64> {
        match parse_line(line) {
            CloneLine::Phase { fraction, .. } => fraction,
            _ => None,
        }
    }

    #[test]
    fn test_receiving_maps_to_first_eighty_percent() {
        assert!(approx(fraction_of("Receiving objects:  50% (5/10)").unwrap(), 0.4));
        assert!(approx(fraction_of("Receiving objects: 100% (10/10), 1.2 MiB | 3 MiB/s, done.").unwrap(), 0.8));
        assert!(approx(fraction_of("Unpacking objects:  25% (1/4)").unwrap(), 0.2));
    }

    #[test]
    fn test_resolving_maps_to_last_twenty_percent() {
        assert!(approx(fraction_of("Resolving deltas:   0% (0/3)").unwrap(), 0.8));
        assert!(approx(fraction_of("Resolving deltas:  50% (1/2)").unwrap(), 0.9));
        assert!(approx(fraction_of("Resolving deltas: 100% (2/2), done.").unwrap(), 1.0));
    }

    #[test]
    fn test_counting_and_compressing_carry_label_only() {
        assert_eq!(
            parse_line("remote: Counting objects: 100% (12/12), done."),
            CloneLine::Phase {
                phase: Phase::Counting,
                fraction: None
            }
        );
        assert_eq!(
            parse_line("remote: Compressing objects:  40% (4/10)"),
            CloneLine::Phase {
                phase: Phase::Compressing,
                fraction: None
            }
        );
        assert_eq!(
            parse_line("Cloning into '/tmp/x'..."),
            CloneLine::Phase {
                phase: Phase::Cloning,
                fraction: None
            }
        );
    }

    #[test]
    fn test_error_lines_are_captured() {
        assert_eq!(
            parse_line("fatal: repository 'https://x/y.git/' not found\n"),
            CloneLine::Error("fatal: repository 'https://x/y.git/' not found".to_string())
        );
        assert!(matches!(parse_line("error: RPC failed"), CloneLine::Error(_)));
    }

    #[test]
    fn test_unrecognized_lines_are_ignored() {
        assert_eq!(parse_line("remote: Enumerating objects: 12, done."), CloneLine::Other);
        assert_eq!(parse_line(""), CloneLine::Other);
    }

    #[test]
    fn test_tracker_is_monotonic_and_capped() {
        let mut tracker = ProgressTracker::new();
        let seen: Vec<f64> = [
            "Receiving objects:  50% (1/2)",
            "Receiving objects:  10% (1/10)",
            "Resolving deltas: 100% (2/2), done.",
            "Receiving objects:  20% (2/10)",
        ]
        .iter()
        .filter_map(|line| tracker.observe(line))
        .map(|p| p.fraction)
        .collect();

        assert!(approx(seen[0], 0.4));
        assert!(approx(seen[1], 0.4));
        assert!(approx(seen[2], MAX_INTERMEDIATE));
        assert!(approx(seen[3], MAX_INTERMEDIATE));
    }

    #[test]
    fn test_tracker_harness_reports_label_without_fraction_change() {
        let mut tracker = ProgressTracker::new();
        tracker.observe("Receiving objects:  50% (1/2)");

        let progress = tracker
            .observe_label("Receiving objects: 100% (3/3)", "Test harness")
            .unwrap();

        assert!(approx(progress.fraction, 0.4));
        assert_eq!(progress.label.as_deref(), Some("Test harness: Receiving objects"));
    }

    #[test]
    fn test_tracker_keeps_last_error_until_taken() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe("fatal: could not read Username").is_none());
        assert_eq!(
            tracker.take_error().as_deref(),
            Some("fatal: could not read Username")
        );
        assert!(tracker.take_error().is_none());
    }
}

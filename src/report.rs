//! JUnit-style XML test report parsing.
//!
//! Reports are produced by the test harness container, either as a single
//! `<testsuite>` document or wrapped in `<testsuites>`. Only the first suite
//! is used.

use crate::error::{KataError, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::sync::LazyLock;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIMESTAMP_FORMAT_FRACTIONAL: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Group label for tests that carry neither a task marker nor a class name.
const FALLBACK_GROUP: &str = "Other";

static TASK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)task[_\s-]?(\d+)").unwrap());

// ============================================================================
// XML schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct SuitesXml {
    #[serde(rename = "testsuite", default)]
    suites: Vec<SuiteXml>,
}

#[derive(Debug, Deserialize)]
struct SuiteXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@tests", default)]
    tests: Option<u32>,
    #[serde(rename = "@failures", default)]
    failures: Option<u32>,
    #[serde(rename = "@errors", default)]
    errors: Option<u32>,
    #[serde(rename = "@skipped", default)]
    skipped: Option<u32>,
    #[serde(rename = "@timestamp", default)]
    timestamp: Option<String>,
    #[serde(rename = "@hostname", default)]
    hostname: Option<String>,
    #[serde(rename = "@time", default)]
    time: Option<String>,
    #[serde(rename = "testcase", default)]
    cases: Vec<CaseXml>,
}

#[derive(Debug, Deserialize)]
struct CaseXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@classname", default)]
    classname: Option<String>,
    #[serde(rename = "@time", default)]
    time: Option<String>,
    #[serde(rename = "failure", default)]
    failures: Vec<FailureXml>,
    #[serde(rename = "error", default)]
    errors: Vec<FailureXml>,
    #[serde(rename = "skipped", default)]
    skipped: Vec<IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct FailureXml {
    #[serde(rename = "@message", default)]
    message: Option<String>,
    #[serde(rename = "@type", default)]
    kind: Option<String>,
    #[serde(rename = "$text", default)]
    content: String,
}

// ============================================================================
// Domain model
// ============================================================================

/// Summary attributes of the suite a report was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteSummary {
    pub name: String,
    pub tests: u32,
    pub failures: u32,
    pub errors: u32,
    pub skipped: u32,
    /// Suite duration in seconds.
    pub time: f64,
    pub timestamp: Option<NaiveDateTime>,
    pub hostname: Option<String>,
}

/// Details of a failed test case, captured verbatim from the report.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureDetail {
    pub message: Option<String>,
    pub kind: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestCaseResult {
    pub name: String,
    pub class_name: Option<String>,
    /// Duration in seconds.
    pub time: f64,
    pub passed: bool,
    pub skipped: bool,
    pub failure: Option<FailureDetail>,
}

/// Aggregated results for one named group of test cases.
#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    pub name: String,
    pub passed: u32,
    pub failed: u32,
    pub time: f64,
    /// Indices into [`TestRunReport::results`].
    pub cases: Vec<usize>,
}

impl TestGroup {
    pub fn total(&self) -> u32 {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRunReport {
    pub suite: SuiteSummary,
    pub results: Vec<TestCaseResult>,
    pub passed_tests: Vec<String>,
    pub failed_tests: Vec<String>,
    pub groups: Vec<TestGroup>,
}

impl TestRunReport {
    pub fn all_passed(&self) -> bool {
        self.failed_tests.is_empty()
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a report document.
///
/// Malformed XML or an unparsable suite timestamp is an error; no partial
/// report is returned.
pub fn parse_report(bytes: &[u8]) -> Result<TestRunReport> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| KataError::ReportParse(format!("report is not valid UTF-8: {}", e)))?;

    let wrapper: SuitesXml = quick_xml::de::from_str(text)?;
    let suite = match wrapper.suites.into_iter().next() {
        Some(suite) => suite,
        None => quick_xml::de::from_str::<SuiteXml>(text)?,
    };

    build_report(suite)
}

fn build_report(suite: SuiteXml) -> Result<TestRunReport> {
    let timestamp = match suite.timestamp.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_timestamp(raw)?),
        _ => None,
    };

    let results: Vec<TestCaseResult> = suite.cases.into_iter().map(build_case).collect();

    let passed_tests = results
        .iter()
        .filter(|r| r.passed)
        .map(|r| r.name.clone())
        .collect();
    let failed_tests = results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.name.clone())
        .collect();
    let groups = group_results(&results);

    Ok(TestRunReport {
        suite: SuiteSummary {
            name: suite.name,
            tests: suite.tests.unwrap_or(results.len() as u32),
            failures: suite.failures.unwrap_or(0),
            errors: suite.errors.unwrap_or(0),
            skipped: suite.skipped.unwrap_or(0),
            time: parse_seconds(suite.time.as_deref()),
            timestamp,
            hostname: suite.hostname,
        },
        results,
        passed_tests,
        failed_tests,
        groups,
    })
}

fn build_case(case: CaseXml) -> TestCaseResult {
    let failure = case
        .failures
        .into_iter()
        .chain(case.errors)
        .next()
        .map(|f| FailureDetail {
            message: f.message,
            kind: f.kind,
            content: f.content,
        });

    TestCaseResult {
        name: case.name,
        class_name: case.classname.filter(|c| !c.is_empty()),
        time: parse_seconds(case.time.as_deref()),
        passed: failure.is_none(),
        skipped: !case.skipped.is_empty(),
        failure,
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT_FRACTIONAL))
        .map_err(|_| KataError::ReportTimestamp(raw.to_string()))
}

/// Durations are informational; an unreadable value counts as zero.
fn parse_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().replace(',', "").parse::<f64>().ok())
        .filter(|t| t.is_finite())
        .unwrap_or(0.0)
}

/// Name of the group a test case belongs to.
///
/// Harness tests follow a `task_<n>` naming convention; anything else falls
/// back to its class name.
pub fn group_name(name: &str, class_name: Option<&str>) -> String {
    if let Some(caps) = TASK_MARKER.captures(name) {
        if let Ok(n) = caps[1].parse::<u32>() {
            return format!("Task {}", n);
        }
    }
    match class_name {
        Some(class) if !class.is_empty() => class.to_string(),
        _ => FALLBACK_GROUP.to_string(),
    }
}

fn group_results(results: &[TestCaseResult]) -> Vec<TestGroup> {
    let mut groups: Vec<TestGroup> = Vec::new();

    for (index, result) in results.iter().enumerate() {
        let name = group_name(&result.name, result.class_name.as_deref());
        let group = match groups.iter().position(|g| g.name == name) {
            Some(pos) => &mut groups[pos],
            None => {
                groups.push(TestGroup {
                    name,
                    passed: 0,
                    failed: 0,
                    time: 0.0,
                    cases: Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };

        if result.passed {
            group.passed += 1;
        } else {
            group.failed += 1;
        }
        group.time += result.time;
        group.cases.push(index);
    }

    groups
}

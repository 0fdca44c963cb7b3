//! Test result display.

use super::colors::*;
use crate::report::TestRunReport;

/// Format a report as grouped, colored lines.
pub fn format_results(report: &TestRunReport) -> Vec<String> {
    let mut lines = Vec::new();

    for group in &report.groups {
        let color = if group.all_passed() { GREEN } else { RED };
        lines.push(format!(
            "{color}{BOLD}{}{RESET} {GRAY}{}/{} passed, {:.2}s{RESET}",
            group.name,
            group.passed,
            group.total(),
            group.time
        ));

        for case in group.cases.iter().filter_map(|&i| report.results.get(i)) {
            if case.passed {
                lines.push(format!("  {GREEN}✓{RESET} {}", case.name));
            } else {
                lines.push(format!("  {RED}✗{RESET} {}", case.name));
                if let Some(failure) = &case.failure {
                    if let Some(message) = &failure.message {
                        lines.push(format!("      {GRAY}{}{RESET}", message));
                    }
                    for detail in failure.content.lines().filter(|l| !l.trim().is_empty()) {
                        lines.push(format!("      {DIM}{}{RESET}", detail.trim_end()));
                    }
                }
            }
        }
    }

    let summary_color = if report.all_passed() { GREEN } else { RED };
    lines.push(String::new());
    lines.push(format!(
        "{summary_color}{BOLD}{} passed, {} failed{RESET} {GRAY}({} tests){RESET}",
        report.passed_tests.len(),
        report.failed_tests.len(),
        report.total()
    ));
    lines
}

pub fn print_results(report: &TestRunReport) {
    for line in format_results(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::parse_report;

    #[test]
    fn test_format_results_lists_groups_and_failures() {
        let report = parse_report(
            br#"<testsuite name="kv">
  <testcase name="test_task_1_set" classname="kv" time="0.25"/>
  <testcase name="test_task_2_get" classname="kv" time="0.5"><failure message="missing">line one
line two</failure></testcase>
</testsuite>"#,
        )
        .unwrap();

        let lines = format_results(&report);

        assert!(lines[0].contains("Task 1"));
        assert!(lines[0].contains("1/1 passed, 0.25s"));
        assert!(lines[1].contains("✓") && lines[1].contains("test_task_1_set"));
        assert!(lines[2].contains("Task 2"));
        assert!(lines[3].contains("✗") && lines[3].contains("test_task_2_get"));
        assert!(lines[4].contains("missing"));
        assert!(lines[5].contains("line one"));
        assert!(lines[6].contains("line two"));
        assert!(lines.last().unwrap().contains("1 passed, 1 failed"));
        assert!(lines.last().unwrap().contains("(2 tests)"));
    }
}

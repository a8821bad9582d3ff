use crate::github::strip_username;
use crate::score::format_grade;
use crate::types::grade::{FailureKind, GradeReport};

pub fn to_markdown(report: &GradeReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("# Grading: {}\n\n", report.assignment));
    if report.dry_run {
        output.push_str("Dry run: no grades were uploaded.\n\n");
    }
    output.push_str(&format!(
        "Graded: {}, failed: {}\n\n",
        report.graded.len(),
        report.failures.len()
    ));
    let unresolved = report
        .failures_of(FailureKind::Unresolved)
        .map(|failure| {
            strip_username(&failure.repository, &report.assignment)
                .unwrap_or(failure.repository.as_str())
        })
        .collect::<Vec<_>>();
    if !unresolved.is_empty() {
        output.push_str(&format!(
            "Unresolved roster entries: {}\n\n",
            unresolved.join(", ")
        ));
    }

    output.push_str("## Grades\n\n");
    if report.graded.is_empty() {
        output.push_str("- none\n\n");
    } else {
        for record in &report.graded {
            output.push_str(&format!(
                "- {} ({} -> {}): {} (raw {}, x{}, late {})\n",
                record.repository,
                record.username,
                record.student_id,
                format_grade(record.score),
                format_grade(record.raw),
                format_grade(record.multiplier),
                format_grade(record.late_penalty)
            ));
        }
        output.push('\n');
    }

    output.push_str("## Failures\n\n");
    if report.failures.is_empty() {
        output.push_str("- none\n");
    } else {
        for failure in &report.failures {
            output.push_str(&format!(
                "- [{}] {}: {}\n",
                failure.kind.as_str(),
                failure.repository,
                failure.message
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::grade::SubmissionFailure;

    #[test]
    fn markdown_report_contains_sections() {
        let mut report = GradeReport::new("hw1", true);
        report.failures.push(SubmissionFailure::new(
            "hw1-bob123",
            FailureKind::Unresolved,
            "no roster entry for username: bob123",
        ));

        let rendered = to_markdown(&report);
        assert!(rendered.contains("# Grading: hw1"));
        assert!(rendered.contains("Dry run"));
        assert!(rendered.contains("Unresolved roster entries: bob123\n"));
        assert!(rendered.contains("## Grades\n\n- none"));
        assert!(rendered.contains("- [unresolved] hw1-bob123: no roster entry for username: bob123"));
    }

    #[test]
    fn unresolved_line_lists_usernames_in_order() {
        let mut report = GradeReport::new("project-2", false);
        for repo in ["project-2-Bob123", "project-2-carol-x"] {
            report.failures.push(SubmissionFailure::new(
                repo,
                FailureKind::Unresolved,
                "no roster entry",
            ));
        }
        report.failures.push(SubmissionFailure::new(
            "project-2-dave",
            FailureKind::NoRuns,
            "no runs of main.yml",
        ));

        let rendered = to_markdown(&report);
        assert!(rendered.contains("Unresolved roster entries: Bob123, carol-x\n"));
        assert!(!rendered.contains("entries: project-2-"));
    }
}

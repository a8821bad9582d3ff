use crate::error::Result;
use crate::github::{assignment_repositories, CiProvider};
use crate::types::grade::{FailureKind, SubmissionFailure};
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct TriggerReport {
    pub triggered: Vec<String>,
    pub failures: Vec<SubmissionFailure>,
}

/// Re-runs the latest `workflow` run of every repository of `assignment`.
pub fn rerun_assignment<C: CiProvider>(
    ci: &C,
    org: &str,
    assignment: &str,
    workflow: &str,
) -> Result<TriggerReport> {
    let repos = ci.list_repositories(org)?;
    let mut report = TriggerReport::default();
    for repo in assignment_repositories(&repos, assignment) {
        let outcome = ci
            .latest_run(org, &repo, workflow)
            .and_then(|run| match run {
                Some(run) => ci.rerun(org, &repo, run.id).map(|()| Some(run.id)),
                None => Ok(None),
            });
        match outcome {
            Ok(Some(run_id)) => {
                info!(%repo, run_id, "re-run requested");
                report.triggered.push(repo);
            }
            Ok(None) => {
                report.failures.push(SubmissionFailure::new(
                    &repo,
                    FailureKind::NoRuns,
                    format!("no runs of {workflow}"),
                ));
            }
            Err(err) => {
                warn!(%repo, error = %err, "re-run failed");
                report
                    .failures
                    .push(SubmissionFailure::new(&repo, FailureKind::Fetch, err.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeCi;

    #[test]
    fn reruns_every_assignment_repository_with_runs() {
        let ci = FakeCi::default()
            .with_run("hw1-alice", Some("failure"), "2024-09-01T20:00:00Z")
            .with_run("hw1-bob", Some("success"), "2024-09-01T20:00:00Z")
            .with_repo("hw1-carol")
            .with_run("hw2-alice", Some("success"), "2024-09-01T20:00:00Z");

        let report = rerun_assignment(&ci, "course", "hw1", "main.yml").expect("trigger");
        assert_eq!(report.triggered, vec!["hw1-alice".to_string(), "hw1-bob".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].repository, "hw1-carol");
        assert_eq!(
            ci.log()
                .iter()
                .filter(|event| event.starts_with("rerun"))
                .count(),
            2
        );
    }

    #[test]
    fn failing_repository_is_reported() {
        let ci = FakeCi::default()
            .with_failing_repo("hw1-alice")
            .with_run("hw1-bob", Some("success"), "2024-09-01T20:00:00Z");
        let report = rerun_assignment(&ci, "course", "hw1", "main.yml").expect("trigger");
        assert_eq!(report.triggered, vec!["hw1-bob".to_string()]);
        assert_eq!(report.failures[0].kind, FailureKind::Fetch);
    }
}

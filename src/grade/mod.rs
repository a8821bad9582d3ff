//! The grading pipeline: fetch every run, score, then upload.
//!
//! All fetches finish before the first upload so one aggregate report can
//! describe the whole batch.

pub mod trigger;

use crate::canvas::GradeSink;
use crate::error::{GraderError, Result};
use crate::github::{assignment_repositories, strip_username, CiProvider};
use crate::roster::Roster;
use crate::score::due::parse_timestamp;
use crate::score::{compute, parse_raw, Score, ScoringOptions};
use crate::types::config::TimestampSource;
use crate::types::grade::{FailureKind, GradeRecord, GradeReport, Submission, SubmissionFailure};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GradeOptions {
    pub assignment: String,
    pub org: String,
    pub workflow: String,
    pub timestamp_source: TimestampSource,
    pub scoring: ScoringOptions,
    pub dry_run: bool,
}

pub fn run_batch<C, G>(
    ci: &C,
    sink: &G,
    roster: &Roster,
    options: &GradeOptions,
) -> Result<GradeReport>
where
    C: CiProvider,
    G: GradeSink,
{
    options.scoring.validate()?;
    let mut report = GradeReport::new(&options.assignment, options.dry_run);

    let repos = ci.list_repositories(&options.org)?;
    let repos = assignment_repositories(&repos, &options.assignment);
    info!(
        assignment = %options.assignment,
        repositories = repos.len(),
        "grading assignment"
    );

    let submissions = fetch_submissions(ci, &repos, options, &mut report);
    let records = score_submissions(&submissions, roster, options, &mut report);
    upload(sink, records, options, &mut report);

    Ok(report)
}

fn fetch_submissions<C: CiProvider>(
    ci: &C,
    repos: &[String],
    options: &GradeOptions,
    report: &mut GradeReport,
) -> Vec<Submission> {
    let mut submissions = Vec::with_capacity(repos.len());
    for repo in repos {
        let Some(username) = strip_username(repo, &options.assignment) else {
            continue;
        };
        match ci.latest_run(&options.org, repo, &options.workflow) {
            Ok(Some(run)) => submissions.push(Submission {
                repository: repo.clone(),
                username: username.to_string(),
                run_id: run.id,
                outcome: run.conclusion.clone(),
                submitted_at: run.submitted_at(options.timestamp_source).to_string(),
            }),
            Ok(None) => {
                warn!(%repo, "no workflow runs");
                report.failures.push(SubmissionFailure::new(
                    repo,
                    FailureKind::NoRuns,
                    format!("no runs of {}", options.workflow),
                ));
            }
            Err(err) => {
                warn!(%repo, error = %err, "fetching workflow run failed");
                report
                    .failures
                    .push(SubmissionFailure::new(repo, FailureKind::Fetch, err.to_string()));
            }
        }
    }
    submissions
}

fn score_submissions(
    submissions: &[Submission],
    roster: &Roster,
    options: &GradeOptions,
    report: &mut GradeReport,
) -> Vec<GradeRecord> {
    let mut records = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let repo = &submission.repository;
        let student_id = match roster.lookup(&submission.username) {
            Ok(student_id) => student_id,
            Err(err) => {
                warn!(%repo, username = %err.username, "username missing from roster");
                report.failures.push(SubmissionFailure::new(
                    repo,
                    FailureKind::Unresolved,
                    err.to_string(),
                ));
                continue;
            }
        };
        match score_one(submission, &options.scoring) {
            Ok((score, submitted_at)) => records.push(GradeRecord {
                repository: repo.clone(),
                username: submission.username.clone(),
                student_id: student_id.to_string(),
                raw: score.raw,
                multiplier: options.scoring.multiplier,
                late_penalty: score.late_penalty,
                score: score.value,
                submitted_at,
            }),
            Err(err) => {
                warn!(%repo, error = %err, "cannot score submission");
                report.failures.push(SubmissionFailure::new(
                    repo,
                    FailureKind::InvalidScore,
                    err.to_string(),
                ));
            }
        }
    }
    records
}

fn score_one(
    submission: &Submission,
    scoring: &ScoringOptions,
) -> Result<(Score, DateTime<Utc>)> {
    let outcome = submission.outcome.as_deref().ok_or_else(|| {
        GraderError::InvalidScoreInput(format!("run {} has not concluded", submission.run_id))
    })?;
    let raw = parse_raw(outcome)?;
    let submitted_at = parse_timestamp(&submission.submitted_at)?;
    Ok((compute(raw, submitted_at, scoring)?, submitted_at))
}

fn upload<G: GradeSink>(
    sink: &G,
    records: Vec<GradeRecord>,
    options: &GradeOptions,
    report: &mut GradeReport,
) {
    if records.is_empty() {
        return;
    }
    if options.dry_run {
        info!(grades = records.len(), "dry run, nothing uploaded");
        report.graded = records;
        return;
    }

    let assignment_id = match sink.assignment_id(&options.assignment) {
        Ok(id) => id,
        Err(err) => {
            warn!(error = %err, "cannot resolve assignment, no grades uploaded");
            for record in &records {
                report.failures.push(SubmissionFailure::new(
                    &record.repository,
                    FailureKind::Upload,
                    err.to_string(),
                ));
            }
            return;
        }
    };

    for record in records {
        match sink.post_grade(assignment_id, &record.student_id, record.score) {
            Ok(()) => {
                info!(
                    repo = %record.repository,
                    student = %record.student_id,
                    score = record.score,
                    "updated grade"
                );
                report.graded.push(record);
            }
            Err(err) => {
                warn!(repo = %record.repository, error = %err, "uploading grade failed");
                report.failures.push(SubmissionFailure::new(
                    &record.repository,
                    FailureKind::Upload,
                    err.to_string(),
                ));
            }
        }
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Latest CI run of one assignment repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub repository: String,
    pub username: String,
    pub run_id: u64,
    /// Run conclusion as reported by the CI provider; `None` while running.
    pub outcome: Option<String>,
    pub submitted_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub username: String,
    pub student_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub repository: String,
    pub username: String,
    pub student_id: String,
    pub raw: f64,
    pub multiplier: f64,
    pub late_penalty: f64,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoRuns,
    Fetch,
    Unresolved,
    InvalidScore,
    Upload,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoRuns => "no_runs",
            Self::Fetch => "fetch",
            Self::Unresolved => "unresolved",
            Self::InvalidScore => "invalid_score",
            Self::Upload => "upload",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionFailure {
    pub repository: String,
    pub kind: FailureKind,
    pub message: String,
}

impl SubmissionFailure {
    pub fn new(repository: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            repository: repository.to_string(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub assignment: String,
    pub dry_run: bool,
    pub graded: Vec<GradeRecord>,
    pub failures: Vec<SubmissionFailure>,
}

impl GradeReport {
    pub fn new(assignment: &str, dry_run: bool) -> Self {
        Self {
            assignment: assignment.to_string(),
            dry_run,
            graded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &SubmissionFailure> {
        self.failures
            .iter()
            .filter(move |failure| failure.kind == kind)
    }
}

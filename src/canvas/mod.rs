//! Canvas LMS grade upload.

use crate::error::{GraderError, Result};
use crate::http::check_status;
use crate::retry::with_retry;
use crate::score::format_grade;
use crate::types::config::{RetryPolicy, UserIdKind};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

/// Write side of the grading platform.
pub trait GradeSink {
    fn assignment_id(&self, name: &str) -> Result<u64>;
    fn post_grade(&self, assignment_id: u64, student_id: &str, score: f64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct Assignment {
    id: u64,
    name: String,
}

/// Canvas addresses users by SIS identifiers through a prefixed path segment.
pub fn user_path_segment(kind: UserIdKind, student_id: &str) -> String {
    match kind {
        UserIdKind::SisLoginId => format!("sis_login_id:{student_id}"),
        UserIdKind::SisUserId => format!("sis_user_id:{student_id}"),
        UserIdKind::Canvas => student_id.to_string(),
    }
}

fn pick_assignment(assignments: Vec<Assignment>, name: &str) -> Result<u64> {
    assignments
        .into_iter()
        .find(|assignment| assignment.name == name)
        .map(|assignment| assignment.id)
        .ok_or_else(|| GraderError::AssignmentNotFound(name.to_string()))
}

pub struct CanvasClient<'a> {
    client: &'a Client,
    base_url: String,
    course_id: String,
    token: String,
    user_id_kind: UserIdKind,
    retry: RetryPolicy,
}

impl<'a> CanvasClient<'a> {
    pub fn new(
        client: &'a Client,
        base_url: &str,
        course_id: &str,
        token: &str,
        user_id_kind: UserIdKind,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            course_id: course_id.to_string(),
            token: token.to_string(),
            user_id_kind,
            retry,
        }
    }
}

impl GradeSink for CanvasClient<'_> {
    fn assignment_id(&self, name: &str) -> Result<u64> {
        let url = format!(
            "{}/api/v1/courses/{}/assignments",
            self.base_url, self.course_id
        );
        let assignments: Vec<Assignment> = with_retry(&self.retry, "find assignment", || {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("search_term", name), ("per_page", "100")])
                .send()?;
            Ok(check_status("canvas", response)?.json()?)
        })?;
        let id = pick_assignment(assignments, name)?;
        debug!(assignment = %name, id, "resolved canvas assignment");
        Ok(id)
    }

    fn post_grade(&self, assignment_id: u64, student_id: &str, score: f64) -> Result<()> {
        let url = format!(
            "{}/api/v1/courses/{}/assignments/{assignment_id}/submissions/{}",
            self.base_url,
            self.course_id,
            user_path_segment(self.user_id_kind, student_id)
        );
        let grade = format_grade(score);
        with_retry(&self.retry, "post grade", || {
            let response = self
                .client
                .put(&url)
                .bearer_auth(&self.token)
                .form(&[("submission[posted_grade]", grade.as_str())])
                .send()?;
            check_status("canvas", response)?;
            Ok(())
        })
    }
}

//! GitHub Actions results for classroom assignment repositories.

use crate::error::Result;
use crate::http::check_status;
use crate::retry::with_retry;
use crate::types::config::{RetryPolicy, TimestampSource};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::debug;

const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub conclusion: Option<String>,
    pub created_at: String,
    pub head_commit: Option<HeadCommit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HeadCommit {
    pub timestamp: String,
}

impl WorkflowRun {
    pub fn submitted_at(&self, source: TimestampSource) -> &str {
        match (source, &self.head_commit) {
            (TimestampSource::Commit, Some(commit)) => &commit.timestamp,
            _ => &self.created_at,
        }
    }
}

#[derive(Deserialize)]
struct RunList {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct Repository {
    name: String,
}

/// Read side of the CI provider, plus re-running a run.
pub trait CiProvider {
    fn list_repositories(&self, org: &str) -> Result<Vec<String>>;
    fn latest_run(&self, org: &str, repo: &str, workflow: &str) -> Result<Option<WorkflowRun>>;
    fn rerun(&self, org: &str, repo: &str, run_id: u64) -> Result<()>;
}

/// Repositories created for `assignment` are named `<assignment>-<username>`.
pub fn strip_username<'r>(repo: &'r str, assignment: &str) -> Option<&'r str> {
    repo.strip_prefix(assignment)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|username| !username.is_empty())
}

pub fn assignment_repositories(repos: &[String], assignment: &str) -> Vec<String> {
    let mut matching = repos
        .iter()
        .filter(|repo| strip_username(repo, assignment).is_some())
        .cloned()
        .collect::<Vec<_>>();
    matching.sort();
    matching
}

pub struct GitHubClient<'a> {
    client: &'a Client,
    api_url: String,
    token: String,
    retry: RetryPolicy,
}

impl<'a> GitHubClient<'a> {
    pub fn new(client: &'a Client, api_url: &str, token: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry,
        }
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

impl CiProvider for GitHubClient<'_> {
    fn list_repositories(&self, org: &str) -> Result<Vec<String>> {
        let url = format!("{}/orgs/{org}/repos", self.api_url);
        let mut names = Vec::new();
        for page in 1.. {
            let repos: Vec<Repository> = with_retry(&self.retry, "list repositories", || {
                let response = self
                    .authed(self.client.get(&url))
                    .query(&[("per_page", PAGE_SIZE), ("page", page)])
                    .send()?;
                Ok(check_status("github", response)?.json()?)
            })?;
            let count = repos.len();
            names.extend(repos.into_iter().map(|repo| repo.name));
            if count < PAGE_SIZE {
                break;
            }
        }
        debug!(%org, repositories = names.len(), "listed organization repositories");
        Ok(names)
    }

    fn latest_run(&self, org: &str, repo: &str, workflow: &str) -> Result<Option<WorkflowRun>> {
        let url = format!(
            "{}/repos/{org}/{repo}/actions/workflows/{workflow}/runs",
            self.api_url
        );
        let response = with_retry(&self.retry, "latest run", || {
            let response = self
                .authed(self.client.get(&url))
                .query(&[("per_page", 1)])
                .send()?;
            // a repository without the workflow file has no runs
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            Ok(Some(check_status("github", response)?.json::<RunList>()?))
        })?;
        Ok(response.and_then(|list| list.workflow_runs.into_iter().next()))
    }

    fn rerun(&self, org: &str, repo: &str, run_id: u64) -> Result<()> {
        let url = format!(
            "{}/repos/{org}/{repo}/actions/runs/{run_id}/rerun",
            self.api_url
        );
        with_retry(&self.retry, "rerun", || {
            let response = self.authed(self.client.post(&url)).send()?;
            check_status("github", response)?;
            Ok(())
        })
    }
}

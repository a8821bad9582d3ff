//! In-memory CI provider and grade sink (testing only).

use crate::canvas::GradeSink;
use crate::error::{GraderError, Result};
use crate::github::{CiProvider, HeadCommit, WorkflowRun};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::thread::JoinHandle;

type EventLog = Rc<RefCell<Vec<String>>>;

fn unavailable(service: &'static str, target: &str) -> GraderError {
    GraderError::Api {
        service,
        status: 503,
        url: target.to_string(),
        body: "service unavailable".to_string(),
    }
}

/// Repositories and their latest runs, recording every call in order.
#[derive(Debug, Default)]
pub struct FakeCi {
    repos: Vec<String>,
    runs: HashMap<String, WorkflowRun>,
    failing: HashSet<String>,
    log: EventLog,
}

impl FakeCi {
    pub fn with_repo(mut self, repo: &str) -> Self {
        self.repos.push(repo.to_string());
        self
    }

    pub fn with_run(mut self, repo: &str, conclusion: Option<&str>, timestamp: &str) -> Self {
        let run = WorkflowRun {
            id: 1000 + self.repos.len() as u64,
            conclusion: conclusion.map(str::to_string),
            created_at: timestamp.to_string(),
            head_commit: Some(HeadCommit {
                timestamp: timestamp.to_string(),
            }),
        };
        self.runs.insert(repo.to_string(), run);
        self.with_repo(repo)
    }

    pub fn with_failing_repo(mut self, repo: &str) -> Self {
        self.failing.insert(repo.to_string());
        self.with_repo(repo)
    }

    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl CiProvider for FakeCi {
    fn list_repositories(&self, org: &str) -> Result<Vec<String>> {
        self.log.borrow_mut().push(format!("list {org}"));
        Ok(self.repos.clone())
    }

    fn latest_run(&self, _org: &str, repo: &str, _workflow: &str) -> Result<Option<WorkflowRun>> {
        self.log.borrow_mut().push(format!("fetch {repo}"));
        if self.failing.contains(repo) {
            return Err(unavailable("github", repo));
        }
        Ok(self.runs.get(repo).cloned())
    }

    fn rerun(&self, _org: &str, repo: &str, run_id: u64) -> Result<()> {
        self.log.borrow_mut().push(format!("rerun {repo} {run_id}"));
        Ok(())
    }
}

/// Records posted grades; can reject students or lack the assignment.
#[derive(Debug, Default)]
pub struct FakeSink {
    posted: RefCell<Vec<(String, f64)>>,
    rejecting: HashSet<String>,
    missing_assignment: bool,
    log: EventLog,
}

impl FakeSink {
    /// Records uploads into the same event log as `ci`.
    pub fn sharing_log_with(mut self, ci: &FakeCi) -> Self {
        self.log = Rc::clone(&ci.log);
        self
    }

    pub fn rejecting(mut self, student_id: &str) -> Self {
        self.rejecting.insert(student_id.to_string());
        self
    }

    pub fn without_assignment(mut self) -> Self {
        self.missing_assignment = true;
        self
    }

    pub fn posted(&self) -> Vec<(String, f64)> {
        self.posted.borrow().clone()
    }
}

impl GradeSink for FakeSink {
    fn assignment_id(&self, name: &str) -> Result<u64> {
        self.log.borrow_mut().push(format!("assignment {name}"));
        if self.missing_assignment {
            return Err(GraderError::AssignmentNotFound(name.to_string()));
        }
        Ok(77)
    }

    fn post_grade(&self, _assignment_id: u64, student_id: &str, score: f64) -> Result<()> {
        self.log.borrow_mut().push(format!("post {student_id}"));
        if self.rejecting.contains(student_id) {
            return Err(unavailable("canvas", student_id));
        }
        self.posted
            .borrow_mut()
            .push((student_id.to_string(), score));
        Ok(())
    }
}

/// Serves `responses` in order, one connection each, on a local port.
///
/// Returns the base URL and a handle yielding the request lines received.
/// The listener closes after the last response, so any extra request fails
/// to connect.
pub fn serve_responses(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener should bind");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("connection");
            let mut received = Vec::new();
            let mut chunk = [0u8; 1024];
            while !received.windows(4).any(|window| window == b"\r\n\r\n") {
                let read = stream.read(&mut chunk).expect("request should read");
                if read == 0 {
                    break;
                }
                received.extend_from_slice(&chunk[..read]);
            }
            let request = String::from_utf8_lossy(&received);
            requests.push(request.lines().next().unwrap_or_default().to_string());
            let response = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .expect("response should write");
        }
        requests
    });
    (base_url, handle)
}

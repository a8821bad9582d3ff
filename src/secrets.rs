use crate::error::{GraderError, Result};
use std::collections::HashMap;

pub const GH_TOKEN: &str = "GH_TOKEN";
pub const CANVAS_TOKEN: &str = "CANVAS_TOKEN";
pub const CANVAS_COURSE_ID: &str = "CANVAS_COURSE_ID";
pub const GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const GOOGLE_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
pub const DEFAULT_PASSPHRASE_VAR: &str = "GRADER_PASSPHRASE";

/// Process environment with `--env NAME=VALUE` overrides layered on top.
///
/// Overrides never touch the real environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    overrides: HashMap<String, String>,
}

impl Environment {
    pub fn new(pairs: &[(String, String)]) -> Self {
        Self {
            overrides: pairs.iter().cloned().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .ok_or_else(|| GraderError::MissingSetting(format!("environment variable {name}")))
    }

    /// Organization owning the assignment repositories, taken from the
    /// `owner/repo` form of `GITHUB_REPOSITORY`.
    pub fn org_from_repository(&self) -> Option<String> {
        self.get(GITHUB_REPOSITORY)
            .and_then(|repository| repository.split('/').next().map(str::to_string))
            .filter(|org| !org.is_empty())
    }
}

/// clap value parser for `--env NAME=VALUE`.
pub fn parse_env_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{raw}`")),
    }
}

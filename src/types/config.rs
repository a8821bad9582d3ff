use crate::error::GraderError;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
pub const DEFAULT_CANVAS_URL: &str = "https://utexas.instructure.com";
pub const DEFAULT_WORKFLOW: &str = "main.yml";
pub const DEFAULT_ROSTER_FILE: &str = "username_map.csv";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraderConfig {
    pub github: Option<GithubConfig>,
    pub canvas: Option<CanvasConfig>,
    pub scoring: Option<ScoringConfig>,
    pub roster: Option<RosterConfig>,
    pub http: Option<HttpConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubConfig {
    pub org: Option<String>,
    pub workflow: Option<String>,
    pub api_url: Option<String>,
    pub timestamp_source: Option<TimestampSource>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    #[default]
    Commit,
    Run,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasConfig {
    pub base_url: Option<String>,
    pub course_id: Option<String>,
    pub user_id_kind: Option<UserIdKind>,
}

/// How roster identifiers address a Canvas user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIdKind {
    #[default]
    SisLoginId,
    SisUserId,
    Canvas,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    pub multiplier: Option<f64>,
    pub points: Option<f64>,
    pub max_points: Option<f64>,
    pub due: Option<String>,
    pub timezone: Option<String>,
    pub late: Option<LateConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum LateConfig {
    None,
    Step {
        factor: f64,
        #[serde(default)]
        grace_minutes: u32,
    },
    Linear {
        per_day: f64,
        #[serde(default)]
        floor: f64,
        #[serde(default)]
        grace_minutes: u32,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterConfig {
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
    pub credential_file: Option<PathBuf>,
    pub username_column: Option<String>,
    pub id_column: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfig {
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }
}

impl GraderConfig {
    pub fn workflow(&self) -> &str {
        self.github
            .as_ref()
            .and_then(|github| github.workflow.as_deref())
            .unwrap_or(DEFAULT_WORKFLOW)
    }

    pub fn github_api_url(&self) -> &str {
        self.github
            .as_ref()
            .and_then(|github| github.api_url.as_deref())
            .unwrap_or(DEFAULT_GITHUB_API)
    }

    pub fn timestamp_source(&self) -> TimestampSource {
        self.github
            .as_ref()
            .and_then(|github| github.timestamp_source)
            .unwrap_or_default()
    }

    pub fn canvas_url(&self) -> &str {
        self.canvas
            .as_ref()
            .and_then(|canvas| canvas.base_url.as_deref())
            .unwrap_or(DEFAULT_CANVAS_URL)
    }

    pub fn user_id_kind(&self) -> UserIdKind {
        self.canvas
            .as_ref()
            .and_then(|canvas| canvas.user_id_kind)
            .unwrap_or_default()
    }

    pub fn roster_file(&self) -> PathBuf {
        self.roster
            .as_ref()
            .and_then(|roster| roster.file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER_FILE))
    }

    pub fn roster_columns(&self) -> (String, String) {
        let roster = self.roster.as_ref();
        (
            roster
                .and_then(|roster| roster.username_column.clone())
                .unwrap_or_else(|| "Github Username".to_string()),
            roster
                .and_then(|roster| roster.id_column.clone())
                .unwrap_or_else(|| "EID".to_string()),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        match &self.http {
            Some(http) => RetryPolicy {
                max_retries: http.max_retries.unwrap_or(defaults.max_retries),
                backoff_base_ms: http.backoff_base_ms.unwrap_or(defaults.backoff_base_ms),
            },
            None => defaults,
        }
    }

    pub fn timeout_secs(&self) -> u64 {
        self.http
            .as_ref()
            .and_then(|http| http.timeout_secs)
            .unwrap_or(30)
    }

    pub fn validate(&self) -> Result<(), GraderError> {
        if let Some(scoring) = &self.scoring {
            if let Some(multiplier) = scoring.multiplier {
                if !multiplier.is_finite() || multiplier < 0.0 {
                    return Err(GraderError::ConfigParse(format!(
                        "scoring.multiplier must be a non-negative number (found {multiplier})"
                    )));
                }
            }
            if let Some(points) = scoring.points {
                if !points.is_finite() || points <= 0.0 {
                    return Err(GraderError::ConfigParse(
                        "scoring.points must be greater than 0".to_string(),
                    ));
                }
            }
            if let Some(max_points) = scoring.max_points {
                if !max_points.is_finite() || max_points < 0.0 {
                    return Err(GraderError::ConfigParse(
                        "scoring.max_points must be a non-negative number".to_string(),
                    ));
                }
            }
            match &scoring.late {
                Some(LateConfig::Step { factor, .. }) if !(0.0..=1.0).contains(factor) => {
                    return Err(GraderError::ConfigParse(
                        "scoring.late.factor must be between 0.0 and 1.0".to_string(),
                    ));
                }
                Some(LateConfig::Linear { per_day, floor, .. }) => {
                    if !per_day.is_finite() || *per_day < 0.0 {
                        return Err(GraderError::ConfigParse(
                            "scoring.late.per_day must be a non-negative number".to_string(),
                        ));
                    }
                    if !(0.0..=1.0).contains(floor) {
                        return Err(GraderError::ConfigParse(
                            "scoring.late.floor must be between 0.0 and 1.0".to_string(),
                        ));
                    }
                }
                _ => {}
            }
        }

        if let Some(github) = &self.github {
            if github
                .workflow
                .as_deref()
                .is_some_and(|workflow| workflow.trim().is_empty())
            {
                return Err(GraderError::ConfigParse(
                    "github.workflow must name a workflow file".to_string(),
                ));
            }
        }

        if let Some(http) = &self.http {
            if http.timeout_secs == Some(0) {
                return Err(GraderError::ConfigParse(
                    "http.timeout_secs must be greater than 0".to_string(),
                ));
            }
            if http.max_retries.is_some_and(|retries| retries > 10) {
                return Err(GraderError::ConfigParse(
                    "http.max_retries must be at most 10".to_string(),
                ));
            }
        }

        Ok(())
    }
}

use thiserror::Error;

/// A repository username that has no entry in the roster.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no roster entry for username: {username}")]
pub struct RosterLookupError {
    pub username: String,
}

#[derive(Error, Debug)]
pub enum GraderError {
    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("missing setting: {0}")]
    MissingSetting(String),

    #[error("invalid score input: {0}")]
    InvalidScoreInput(String),

    #[error("roster error: {0}")]
    Roster(String),

    #[error("roster file {path}: {message}")]
    RosterFile { path: String, message: String },

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status} for {url}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        url: String,
        body: String,
    },

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GraderError {
    /// Errors worth another attempt: failed connections, timeouts,
    /// throttling and server-side failures. Undecodable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            GraderError::Http(err) => err.is_connect() || err.is_timeout(),
            GraderError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Errors raised before anything is sent over the network.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            GraderError::ConfigParse(_)
                | GraderError::MissingSetting(_)
                | GraderError::InvalidScoreInput(_)
                | GraderError::InvalidCredential(_)
                | GraderError::PathNotFound(_)
                | GraderError::RosterFile { .. }
                | GraderError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GraderError>;

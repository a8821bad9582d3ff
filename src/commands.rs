use crate::canvas::CanvasClient;
use crate::cli::{
    DecryptCommand, EncryptCommand, GradeCommand, PassphraseArgs, ReportFormat, TriggerCommand,
};
use crate::config;
use crate::credential::{self, ServiceAccountKey};
use crate::error::{GraderError, Result};
use crate::exit_code;
use crate::github::GitHubClient;
use crate::grade::trigger::{self, TriggerReport};
use crate::grade::{self, GradeOptions};
use crate::http;
use crate::report;
use crate::roster::sheet::{roster_from_sheet, GoogleSheet};
use crate::roster::Roster;
use crate::score::due::parse_due;
use crate::score::late::LatePolicy;
use crate::score::ScoringOptions;
use crate::secrets::{self, Environment};
use crate::types::config::GraderConfig;
use crate::types::grade::GradeReport;
use chrono::Duration;
use reqwest::blocking::Client;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

pub fn execute_grade(cmd: &GradeCommand, config_path: Option<&Path>) -> Result<i32> {
    let config = config::load_config(Path::new("."), config_path)?;
    let env = Environment::new(&cmd.env);
    let options = grade_options(cmd, &config, &env)?;

    let gh_token = env.require(secrets::GH_TOKEN)?;
    let (canvas_token, course_id) = if options.dry_run {
        (String::new(), String::new())
    } else {
        (
            env.require(secrets::CANVAS_TOKEN)?,
            course_id(&config, &env)?,
        )
    };

    let client = http::build_client(config.timeout_secs())?;
    let roster = load_roster(&config, &env, &cmd.passphrase, &client, &options.org)?;
    if roster.is_empty() {
        warn!("roster has no entries, every submission will be unresolved");
    } else {
        info!(entries = roster.len(), "roster loaded");
    }

    let retry = config.retry_policy();
    let ci = GitHubClient::new(&client, config.github_api_url(), &gh_token, retry);
    let sink = CanvasClient::new(
        &client,
        config.canvas_url(),
        &course_id,
        &canvas_token,
        config.user_id_kind(),
        retry,
    );

    let grade_report = grade::run_batch(&ci, &sink, &roster, &options)?;
    let output_format = match cmd.format {
        ReportFormat::Json => report::OutputFormat::Json,
        ReportFormat::Md => report::OutputFormat::Md,
    };
    println!("{}", report::render(&grade_report, output_format)?);
    Ok(grade_exit_code(&grade_report))
}

pub(crate) fn grade_exit_code(report: &GradeReport) -> i32 {
    if report.has_failures() {
        exit_code::SUBMISSION_FAILURES
    } else {
        exit_code::SUCCESS
    }
}

pub(crate) fn trigger_exit_code(report: &TriggerReport) -> i32 {
    if report.failures.is_empty() {
        exit_code::SUCCESS
    } else {
        exit_code::SUBMISSION_FAILURES
    }
}

pub fn execute_trigger(cmd: &TriggerCommand, config_path: Option<&Path>) -> Result<i32> {
    let config = config::load_config(Path::new("."), config_path)?;
    let env = Environment::new(&cmd.env);
    let org = resolve_org(cmd.org.as_deref(), &config, &env)?;
    let workflow = cmd.workflow.as_deref().unwrap_or(config.workflow());
    let gh_token = env.require(secrets::GH_TOKEN)?;

    let client = http::build_client(config.timeout_secs())?;
    let ci = GitHubClient::new(&client, config.github_api_url(), &gh_token, config.retry_policy());
    let trigger_report = trigger::rerun_assignment(&ci, &org, &cmd.assignment, workflow)?;

    println!("re-run requested for {} repositories:", trigger_report.triggered.len());
    for repo in &trigger_report.triggered {
        println!("    {repo}");
    }
    for failure in &trigger_report.failures {
        println!("[{}] {}: {}", failure.kind.as_str(), failure.repository, failure.message);
    }
    Ok(trigger_exit_code(&trigger_report))
}

pub fn execute_encrypt(cmd: &EncryptCommand) -> Result<i32> {
    if !cmd.input.exists() {
        return Err(GraderError::PathNotFound(cmd.input.display().to_string()));
    }
    let plaintext = std::fs::read(&cmd.input)?;
    let key = ServiceAccountKey::from_json(&plaintext)?;
    let passphrase = credential::read_passphrase(
        cmd.passphrase.passphrase_file.as_deref(),
        &cmd.passphrase.passphrase_env,
    )?;

    let envelope = credential::encrypt(&plaintext, &passphrase)?;
    let fingerprint = credential::fingerprint(&plaintext);
    match &cmd.output {
        Some(path) => {
            std::fs::write(path, format!("{envelope}\n"))?;
            println!("encrypted credential for {}", key.client_email);
            println!("wrote {}", path.display());
            println!("sha256: {fingerprint}");
        }
        None => {
            println!("{envelope}");
            eprintln!("sha256: {fingerprint}");
        }
    }
    Ok(exit_code::SUCCESS)
}

pub fn execute_decrypt(cmd: &DecryptCommand) -> Result<i32> {
    if !cmd.input.exists() {
        return Err(GraderError::PathNotFound(cmd.input.display().to_string()));
    }
    let envelope = std::fs::read_to_string(&cmd.input)?;
    let passphrase = credential::read_passphrase(
        cmd.passphrase.passphrase_file.as_deref(),
        &cmd.passphrase.passphrase_env,
    )?;

    let plaintext = credential::decrypt(&envelope, &passphrase)?;
    match &cmd.output {
        Some(path) => std::fs::write(path, &plaintext)?,
        None => std::io::stdout().write_all(&plaintext)?,
    }
    eprintln!("sha256: {}", credential::fingerprint(&plaintext));
    Ok(exit_code::SUCCESS)
}

/// Builds the immutable options for a grading run. Fails on bad input
/// before any secret is read or request is sent.
pub(crate) fn grade_options(
    cmd: &GradeCommand,
    config: &GraderConfig,
    env: &Environment,
) -> Result<GradeOptions> {
    let scoring_config = config.scoring.clone().unwrap_or_default();
    let timezone = cmd
        .tz
        .clone()
        .or(scoring_config.timezone.clone())
        .unwrap_or_else(|| "UTC".to_string());
    let due = cmd
        .due
        .as_deref()
        .or(scoring_config.due.as_deref())
        .map(|raw| parse_due(raw, &timezone))
        .transpose()?;

    let late = match (cmd.late_per_day, cmd.late_factor) {
        (Some(per_day), _) => LatePolicy::Linear {
            per_day,
            floor: 0.0,
            grace: Duration::zero(),
        },
        (None, Some(factor)) => LatePolicy::Step {
            factor,
            grace: Duration::zero(),
        },
        (None, None) => scoring_config
            .late
            .as_ref()
            .map(LatePolicy::from)
            .unwrap_or_default(),
    };

    let scoring = ScoringOptions {
        multiplier: cmd.multiplier.or(scoring_config.multiplier).unwrap_or(1.0),
        points: cmd.points.or(scoring_config.points).unwrap_or(1.0),
        max_points: cmd.max_points.or(scoring_config.max_points),
        due,
        late,
    };
    scoring.validate()?;
    if due.is_none() && scoring.late != LatePolicy::None {
        warn!("late policy has no effect without a due date");
    }

    Ok(GradeOptions {
        assignment: cmd.assignment.clone(),
        org: resolve_org(cmd.org.as_deref(), config, env)?,
        workflow: cmd
            .workflow
            .clone()
            .unwrap_or_else(|| config.workflow().to_string()),
        timestamp_source: config.timestamp_source(),
        scoring,
        dry_run: cmd.dry_run,
    })
}

fn resolve_org(flag: Option<&str>, config: &GraderConfig, env: &Environment) -> Result<String> {
    flag.map(str::to_string)
        .or_else(|| config.github.as_ref().and_then(|github| github.org.clone()))
        .or_else(|| env.org_from_repository())
        .ok_or_else(|| {
            GraderError::MissingSetting(
                "organization: pass --org, set github.org, or set GITHUB_REPOSITORY".to_string(),
            )
        })
}

fn course_id(config: &GraderConfig, env: &Environment) -> Result<String> {
    config
        .canvas
        .as_ref()
        .and_then(|canvas| canvas.course_id.clone())
        .or_else(|| env.get(secrets::CANVAS_COURSE_ID))
        .ok_or_else(|| {
            GraderError::MissingSetting(
                "canvas course: set canvas.course_id or CANVAS_COURSE_ID".to_string(),
            )
        })
}

/// Reads the roster from the CSV file when present, otherwise from the
/// Google Sheet unlocked by the encrypted credential.
fn load_roster(
    config: &GraderConfig,
    env: &Environment,
    passphrase: &PassphraseArgs,
    client: &Client,
    org: &str,
) -> Result<Roster> {
    let (username_column, id_column) = config.roster_columns();
    let file = config.roster_file();
    if file.exists() {
        return Roster::from_csv_path(&file, &username_column, &id_column);
    }

    let credential_file = config
        .roster
        .as_ref()
        .and_then(|roster| roster.credential_file.as_ref());
    let envelope = match credential_file {
        Some(path) if path.exists() => std::fs::read_to_string(path)?,
        Some(path) => return Err(GraderError::PathNotFound(path.display().to_string())),
        None => env.get(secrets::GOOGLE_CLIENT_SECRET).ok_or_else(|| {
            GraderError::MissingSetting(format!(
                "roster: create {} or provide an encrypted Google credential",
                file.display()
            ))
        })?,
    };
    let passphrase = match passphrase.passphrase_file.as_deref() {
        Some(path) => credential::read_passphrase(Some(path), &passphrase.passphrase_env)?,
        None => env.require(&passphrase.passphrase_env)?,
    };
    let key = ServiceAccountKey::from_json(&credential::decrypt(&envelope, &passphrase)?)?;

    let title = config
        .roster
        .as_ref()
        .and_then(|roster| roster.sheet.clone())
        .unwrap_or_else(|| format!("{org} Github Names"));
    let sheet = GoogleSheet::new(client, key, &title, config.retry_policy());
    roster_from_sheet(&sheet, &username_column, &id_column)
}

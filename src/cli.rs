use crate::secrets::{parse_env_pair, DEFAULT_PASSPHRASE_VAR};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "canvas-grader",
    version,
    about = "Scrape GitHub Actions results and upload them to Canvas as grades"
)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Use this file instead of ./grader.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Score the latest workflow run of every assignment repository and post the grades
    Grade(GradeCommand),
    /// Re-run the latest workflow run of every assignment repository
    Trigger(TriggerCommand),
    /// Encrypt a Google service-account credential file
    Encrypt(EncryptCommand),
    /// Decrypt a credential file produced by `encrypt`
    Decrypt(DecryptCommand),
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ReportFormat {
    Json,
    Md,
}

#[derive(Args)]
pub struct GradeCommand {
    /// Assignment name; repositories are named <assignment>-<username>
    pub assignment: String,

    /// GitHub organization (defaults to github.org, then GITHUB_REPOSITORY)
    #[arg(long)]
    pub org: Option<String>,

    /// Workflow file whose runs are graded
    #[arg(long)]
    pub workflow: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub multiplier: Option<f64>,

    /// Full-credit points for a passing run
    #[arg(long)]
    pub points: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_points: Option<f64>,

    /// Due date: RFC 3339, or YYYY-MM-DD HH:MM[:SS] in --tz
    #[arg(long)]
    pub due: Option<String>,

    /// IANA time zone for --due
    #[arg(long)]
    pub tz: Option<String>,

    /// Linear late penalty per started day
    #[arg(long, conflicts_with = "late_factor", allow_negative_numbers = true)]
    pub late_per_day: Option<f64>,

    /// Flat late penalty factor
    #[arg(long)]
    pub late_factor: Option<f64>,

    #[arg(short, long, value_enum, default_value = "md")]
    pub format: ReportFormat,

    /// Compute grades without uploading them
    #[arg(long)]
    pub dry_run: bool,

    /// Override an environment variable for this run
    #[arg(long = "env", value_name = "NAME=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Unlocks the encrypted Google credential when the roster is a sheet
    #[command(flatten)]
    pub passphrase: PassphraseArgs,
}

#[derive(Args)]
pub struct TriggerCommand {
    pub assignment: String,

    #[arg(long)]
    pub org: Option<String>,

    #[arg(long)]
    pub workflow: Option<String>,

    #[arg(long = "env", value_name = "NAME=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
}

#[derive(Args)]
pub struct PassphraseArgs {
    /// Environment variable holding the passphrase
    #[arg(long, default_value = DEFAULT_PASSPHRASE_VAR)]
    pub passphrase_env: String,

    /// Read the passphrase from the first line of this file instead
    #[arg(long)]
    pub passphrase_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct EncryptCommand {
    /// Service-account JSON key
    pub input: PathBuf,

    /// Write the envelope here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub passphrase: PassphraseArgs,
}

#[derive(Args)]
pub struct DecryptCommand {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub passphrase: PassphraseArgs,
}

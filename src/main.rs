mod canvas;
mod cli;
mod commands;
mod config;
mod credential;
mod error;
#[cfg(test)]
mod fakes;
mod github;
mod grade;
mod http;
mod report;
mod retry;
mod roster;
mod score;
mod secrets;
mod telemetry;
mod types;

use crate::error::GraderError;
use clap::Parser;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const SUBMISSION_FAILURES: i32 = 1;
    pub const INPUT_ERROR: i32 = 2;
    pub const RUNTIME_FAILURE: i32 = 3;
}

fn run() -> Result<i32, GraderError> {
    let cli = cli::Cli::parse();
    telemetry::init_tracing(cli.verbose, cli.quiet);
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
    }

    let config_path = cli.config.as_deref();
    match &cli.command {
        cli::Commands::Grade(cmd) => commands::execute_grade(cmd, config_path),
        cli::Commands::Trigger(cmd) => commands::execute_trigger(cmd, config_path),
        cli::Commands::Encrypt(cmd) => commands::execute_encrypt(cmd),
        cli::Commands::Decrypt(cmd) => commands::execute_decrypt(cmd),
    }
}

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            let code = if e.is_input_error() {
                exit_code::INPUT_ERROR
            } else {
                exit_code::RUNTIME_FAILURE
            };
            std::process::exit(code);
        }
    }
}

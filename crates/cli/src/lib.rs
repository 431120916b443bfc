pub mod commands;
pub mod logging;
pub mod render;

use clap::{Parser, Subcommand};
use ims_tracker_core::config::{AppConfig, LoadOptions};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "ims-tracker",
    about = "IMS approval tracker CLI",
    long_about = "Inspect approval timelines and request listings from the IMS approval backend.",
    after_help = "Examples:\n  ims-tracker timeline APR-1042\n  ims-tracker requests --user 17 --status pending\n  ims-tracker doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show the approval timeline of one request, most recent action first")]
    Timeline {
        #[arg(value_name = "APPROVAL_ID")]
        approval_id: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the requests submitted by a user")]
    Requests {
        #[arg(long, value_name = "USER_ID")]
        user: String,
        #[arg(long, help = "Only show requests in this status (e.g. pending, approved)")]
        status: Option<String>,
        #[arg(long, help = "Case-insensitive match on id, title, requester or type")]
        search: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the request history of the caller's wing")]
    WingHistory {
        #[arg(long, help = "Only show requests in this status (e.g. pending, approved)")]
        status: Option<String>,
        #[arg(long, help = "Case-insensitive match on id, title, requester or type")]
        search: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and check that the approval backend is reachable")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        if let Err(error) = logging::init(&config) {
            eprintln!("{error:#}");
        }
    }

    let result = match cli.command {
        Command::Timeline { approval_id, json } => commands::timeline::run(&approval_id, json),
        Command::Requests { user, status, search, json } => {
            commands::requests::run(&user, status.as_deref(), search, json)
        }
        Command::WingHistory { status, search, json } => {
            commands::wing_history::run(status.as_deref(), search, json)
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    tracing::debug!(
        event_name = "tracker.cli.command_finished",
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Kikourou command line
//!
//! Imports Strava activities missing from the Kikourou training log.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use strava_kikourou::{
    config::Config,
    error::{Side, SyncError},
    models::ActivityRecord,
    services::{
        translator::split_duration, ActivitySource, FieldTranslator, KikourouClient, Matcher,
        StravaClient, StravaService, SyncDriver, SyncOptions, SyncReport, TokenStore,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(version, about = "Copy Strava activities into the Kikourou training log")]
struct Cli {
    /// Configuration file (default: $SYNC_CONFIG or config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Create Kikourou entries for new Strava activities (default)
    Sync {
        /// Show what would be created without submitting anything
        #[arg(long)]
        dry_run: bool,
        /// Fail instead of opening the Strava authorization flow
        #[arg(long)]
        non_interactive: bool,
    },
    /// Authorize access to Strava and store the tokens
    Authorize,
    /// Print the activities read from one side
    List {
        #[arg(value_enum)]
        side: ListSide,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ListSide {
    Strava,
    Kikourou,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            if e.is_pre_write() {
                eprintln!("Nothing was written to Kikourou.");
            }
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), SyncError> {
    let path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&path)?;
    tracing::info!(config = %path.display(), "Starting Strava-Kikourou");

    let mut strava = StravaService::new(
        StravaClient::new(
            config.strava.client_id.clone(),
            config.strava.client_secret.clone(),
        ),
        TokenStore::new(&config.strava.token_file),
        config.strava.callback_port,
    );

    match cli.command.unwrap_or(Command::Sync {
        dry_run: false,
        non_interactive: false,
    }) {
        Command::Authorize => {
            config.require_strava()?;
            strava.authorize().await?;
            println!("Strava access authorized.");
        }
        Command::List { side, json } => {
            let activities = match side {
                ListSide::Strava => {
                    config.require_strava()?;
                    strava.connect(true).await?;
                    strava.fetch_activities().await?
                }
                ListSide::Kikourou => {
                    config.require_kikourou()?;
                    let kikourou = KikourouClient::new(&config.kikourou)?;
                    kikourou.login().await?;
                    kikourou.fetch_activities().await?
                }
            };
            if json {
                let out = serde_json::to_string_pretty(&activities)
                    .map_err(|e| SyncError::Internal(e.into()))?;
                println!("{}", out);
            } else {
                print_activities(&activities);
            }
        }
        Command::Sync {
            dry_run,
            non_interactive,
        } => {
            config.validate()?;
            // Failing to open either session happens before any write
            strava
                .connect(!non_interactive)
                .await
                .map_err(|e| SyncError::unavailable(Side::Strava, e))?;
            let kikourou = KikourouClient::new(&config.kikourou)?;
            kikourou
                .login()
                .await
                .map_err(|e| SyncError::unavailable(Side::Kikourou, e))?;

            let driver = SyncDriver::new(
                strava,
                kikourou,
                Matcher::new(config.matching),
                FieldTranslator::new(config.translator.clone()),
            );
            let report = driver.run(SyncOptions { dry_run }).await?;
            print_report(&report);
        }
    }

    Ok(())
}

fn print_activities(activities: &[ActivityRecord]) {
    for a in activities {
        println!(
            "{}  {:>8.3} km  {:>8}  {:<12} {}",
            a.start,
            a.distance_km(),
            format_elapsed(a.elapsed.as_secs()),
            a.activity_type,
            a.name
        );
    }
    println!("{} activities", activities.len());
}

fn print_report(report: &SyncReport) {
    println!(
        "Strava: {}  Kikourou: {}  matched: {}  created: {}",
        report.fetched_strava, report.fetched_kikourou, report.matched, report.created
    );
    for entry in &report.pending {
        println!("would create {}", entry);
    }
    for unmapped in &report.unmapped {
        println!(
            "activity {} has unmapped type '{}' (default sport used)",
            unmapped.activity_id, unmapped.activity_type
        );
    }
}

fn format_elapsed(secs: u64) -> String {
    let (hours, minutes, seconds) = split_duration(secs);
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Initialize logging: human-readable by default, JSON with `LOG_FORMAT=json`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("strava_kikourou=debug,info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

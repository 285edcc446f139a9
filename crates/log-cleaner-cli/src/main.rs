mod commands;
mod logging;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use log_cleaner_core::config::load_configuration;
use log_cleaner_core::{AppConfig, MaintenanceEngine, SmtpMailer, SystemVolumes};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let config =
        load_configuration(args.config.as_deref()).context("Error loading configuration")?;

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_maintenance(&config),
        Commands::CheckDrives => run_check_drives(&config),
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    }
}

fn run_maintenance(config: &AppConfig) -> anyhow::Result<()> {
    let mailer = SmtpMailer::new(&config.mail);
    let engine = MaintenanceEngine::new(config, &SystemVolumes, &mailer);
    info!(
        "Starting maintenance of {} log directories",
        config.log_directories.len()
    );

    let summary = engine.run()?;

    for dir in &summary.directories {
        match &dir.error {
            Some(err) => warn!("{}: {}", dir.path.display(), err.red()),
            None => info!(
                "{}: {} archived into {}, {} originals and {} expired archives removed, {} failures",
                dir.path.display(),
                format!("{}", dir.archived).green(),
                dir.archive_path.display(),
                dir.originals_removed,
                dir.expired_archives_removed,
                format!("{}", dir.archive_failures + dir.delete_failures).red(),
            ),
        }
    }

    info!(
        "Run finished in {}: {} files archived, {} files removed, {} volumes checked, {} alerts sent",
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
        format!("{}", summary.files_archived()).green(),
        format!("{}", summary.files_removed()).green(),
        format!("{}", summary.volumes.len()).cyan(),
        format!("{}", summary.alerts_sent).red(),
    );
    if summary.failed_directories() > 0 || summary.alerts_failed > 0 {
        warn!(
            "{} directories failed, {} alerts could not be sent",
            summary.failed_directories(),
            summary.alerts_failed
        );
    }

    Ok(())
}

fn run_check_drives(config: &AppConfig) -> anyhow::Result<()> {
    let mailer = SmtpMailer::new(&config.mail);
    let engine = MaintenanceEngine::new(config, &SystemVolumes, &mailer);

    let (volumes, sent, failed) = engine.drive_pass();
    info!(
        "{} volumes checked, {} alerts sent, {} failed",
        format!("{}", volumes.len()).cyan(),
        format!("{}", sent).red(),
        failed
    );

    Ok(())
}

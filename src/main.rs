use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use freshen::config::Config;
use freshen::error::FreshenError;
use freshen::invoke::{RunResponse, invoke};

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("freshen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("freshen.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let level = if verbose { "debug" } else { config.log_level.as_str() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    match cli.action() {
        Commands::Run { dry_run } => {
            if cli.is_verbose() {
                eprintln!("{}", "Verbose mode enabled".yellow());
            }
            if dry_run {
                eprintln!(
                    "{} using local fields in {}",
                    "Dry run:".cyan(),
                    config.session.local_dir.display()
                );
            }
            let response = invoke(config, dry_run).await;
            finish(response)
        }
        Commands::Targets => {
            list_targets(config);
            Ok(())
        }
    }
}

fn list_targets(config: &Config) {
    if config.targets.is_empty() {
        println!("{}", "No targets configured".yellow());
        return;
    }

    for target in &config.targets {
        let state = if target.enabled {
            "enabled".green()
        } else {
            "disabled".dimmed()
        };
        let location = target.field.page_url.as_deref().unwrap_or("-");
        println!("{:<20} {:<10} {}", target.id.bold(), state, location);
    }
}

/// Print the response body and exit with its code.
fn finish(response: RunResponse) -> ! {
    println!("{}", response.body);
    std::process::exit(response.exit_code);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; a bad config is a run fault, not a crash
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            finish(RunResponse::fault(&FreshenError::Config(format!("{:#}", e))));
        }
    };

    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

//! POI Ingest - Main entry point

use clap::Parser;
use poi_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use poi_ingest::{commands, Cli, Commands};
use std::process;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("poi-ingest")
        .build();

    // Environment variables take precedence over the flag-derived defaults
    let log_config = match log_config.clone().merge_env() {
        Ok(merged) => merged,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {}", e);
            log_config
        },
    };

    // Ingestion should still run without logging
    let guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        },
    };

    let result = execute_command(&cli).await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        drop(guard);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.ingest_config()?;

    match &cli.command {
        Commands::Ingest { files } => {
            let reports = commands::ingest::run(files.clone(), config).await?;
            for report in reports.iter().filter(|r| r.outcome.error().is_some()) {
                warn!(
                    run_id = %report.run_id,
                    state = %report.state(),
                    inserted = report.inserted,
                    "Run did not complete"
                );
            }
            Ok(())
        },
        Commands::Inspect { file } => commands::inspect::run(file, config.max_frame_length).await,
        Commands::Pack { input, output } => {
            commands::pack::run(input, output).await?;
            Ok(())
        },
    }
}

//! Binary entry point for repostwatch.
//!
//! This binary provides the CLI interface for the duplicate-post watcher.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use repostwatch::cli::{FingerprintCommand, RunCommand, StatusCommand};
use repostwatch::config::RepostwatchConfig;
use repostwatch::models::{ActionMode, SurfaceId};
use repostwatch::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Repostwatch - duplicate-post detection for a Telegram channel and its chat.
#[derive(Parser)]
#[command(name = "repostwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Watch the channel and chat for duplicates.
    Run {
        /// Action mode: watch, warn, or delete.
        #[arg(short, long)]
        mode: Option<ActionMode>,

        /// Channel `@username` or numeric id.
        #[arg(long)]
        channel: Option<SurfaceId>,

        /// Chat `@username` or numeric id.
        #[arg(long)]
        chat: Option<SurfaceId>,
    },

    /// Show bot identity and effective configuration.
    Status,

    /// Show how a text message would be fingerprinted.
    Fingerprint {
        /// The message text.
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let config = match RepostwatchConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: RepostwatchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            mode,
            channel,
            chat,
        } => {
            RunCommand {
                mode,
                channel,
                chat,
            }
            .execute(config)
            .await?;
        },
        Commands::Status => {
            print!("{}", StatusCommand::new().execute(&config).await?);
        },
        Commands::Fingerprint { text } => {
            print!(
                "{}",
                FingerprintCommand::new(config.dedup.min_text_length).report(&text)
            );
        },
    }
    Ok(())
}

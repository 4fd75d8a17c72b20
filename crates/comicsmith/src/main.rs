//! Comicsmith CLI binary.
//!
//! This binary provides command-line access to the comic pipeline:
//! - Generate comic pages from a transcript
//! - Preview the scene and panel breakdown of a transcript

use clap::Parser;
use comicsmith::observability::{ObservabilityConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, plan_transcript, run_transcript};

    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::new().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability(observability)?;

    match cli.command {
        Commands::Run { transcript, json } => {
            run_transcript(&transcript, cli.config.as_deref(), json).await?;
        }

        Commands::Plan { transcript } => {
            plan_transcript(&transcript, cli.config.as_deref()).await?;
        }
    }

    Ok(())
}

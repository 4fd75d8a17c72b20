//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Comicsmith - turn role-play transcripts into comic pages
#[derive(Parser, Debug)]
#[command(name = "comicsmith")]
#[command(about = "Turn role-play transcripts into comic pages", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to bundled, home and ./comicsmith.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate comic pages from a transcript
    Run {
        /// Path to the transcript JSON file
        transcript: PathBuf,

        /// Print the mission summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Segment a transcript into scenes and panels without generating images
    Plan {
        /// Path to the transcript JSON file
        transcript: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "comicsmith",
            "run",
            "session.json",
            "--json",
            "--config",
            "custom.toml",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(!cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Run { transcript, json } => {
                assert_eq!(transcript, PathBuf::from("session.json"));
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_plan_command() {
        let cli = Cli::try_parse_from(["comicsmith", "--json-logs", "plan", "session.json"]).unwrap();

        assert!(cli.json_logs);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }

    #[test]
    fn test_transcript_is_required() {
        assert!(Cli::try_parse_from(["comicsmith", "run"]).is_err());
    }
}

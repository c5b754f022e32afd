use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "coastwatch", version, about = "Coastal tide and weather ingestion")]
pub struct Cli {
    /// Configuration file path (defaults to ./coastwatch.toml when present)
    #[arg(short, long, global = true, env = "COASTWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the query API and the ingestion scheduler (default)
    Start,

    /// Run one ingestion pass in the foreground; exits non-zero if any location failed
    Ingest {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one location's observations for a date
    Clear {
        country: String,
        city: String,

        /// Date to clear, YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// List configured and stored locations
    Locations,

    /// Show store statistics
    Stats,

    /// Test configuration validity and store access
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration (with secrets masked)
    Show,

    /// Validate configuration
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

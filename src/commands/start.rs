use anyhow::Result;
use coastwatch::{config::Config, server};
use colored::Colorize;
use tracing::info;

/// Execute the start command
///
/// Blocks until a shutdown signal arrives.
pub async fn execute(cfg: Config) -> Result<()> {
    println!("{}", "Starting coastwatch in foreground mode...".green());
    info!("Starting coastwatch");

    server::start_server(cfg).await
}

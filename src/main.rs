use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;

use coastwatch::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    if let cli::Commands::Version = command {
        println!("coastwatch v{}", env!("CARGO_PKG_VERSION"));
        return Ok(ExitCode::SUCCESS);
    }

    let cfg = config::load_config(args.config.as_deref())?;
    let _log_guard = init_tracing(&cfg.server)?;

    match command {
        cli::Commands::Start => commands::start::execute(cfg).await?,
        cli::Commands::Ingest { json } => {
            let report = commands::ingest::execute(cfg, json).await?;
            return Ok(ExitCode::from(report.exit_code()));
        }
        cli::Commands::Clear { country, city, date } => {
            commands::clear::execute(cfg, &country, &city, date.as_deref()).await?
        }
        cli::Commands::Locations => commands::locations::execute(cfg).await?,
        cli::Commands::Stats => commands::stats::execute(cfg).await?,
        cli::Commands::Test => commands::test::execute(cfg).await?,
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&cfg)?,
            cli::ConfigCommands::Validate => commands::config::validate(&cfg)?,
        },
        cli::Commands::Version => {}
    }

    Ok(ExitCode::SUCCESS)
}

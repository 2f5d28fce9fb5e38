use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;

use throughput::cli::commands::Commands;
use throughput::cli::speedtest_commands::SpeedTestMode;
use throughput::cli::{Cli, MonitorCommandHandler, SpeedTestCommandHandler};
use throughput::settings::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Live { interval, count } => {
            MonitorCommandHandler::new(config.sampler)
                .handle_live(interval, count)
                .await?;
        }
        Commands::Adapters => {
            MonitorCommandHandler::new(config.sampler).handle_adapters()?;
        }
        Commands::Speedtest { json } => {
            SpeedTestCommandHandler::new(config.speedtest)?
                .handle(SpeedTestMode::Full, json)
                .await?;
        }
        Commands::Quick { json } => {
            SpeedTestCommandHandler::new(config.speedtest)?
                .handle(SpeedTestMode::Quick, json)
                .await?;
        }
    }

    Ok(())
}

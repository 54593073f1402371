use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::context::CliContext;
use super::env::CliArgs;
use super::info::cmd_info;
use super::runtime::{init_logging, load_config, LoadedConfig};
use super::{cmd_probe, cmd_settings, cmd_watch};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_json)?;
    info!("Starting ScoreBridge v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let ctx = CliContext::new(config, path);

    let result = match cli.command {
        Commands::Watch(args) => cmd_watch(args, &ctx).await,
        Commands::Probe(args) => cmd_probe(args, &ctx).await,
        Commands::Settings(args) => cmd_settings(args, &ctx).await,
        Commands::Info => cmd_info(&ctx),
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use marketscout_cli::{init_logging, load_config, LoadedConfig};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let format = cli.log_format.map(Into::into).unwrap_or(config.log_format);
    init_logging(&level, cli.debug, format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
        "Starting MarketScout"
    );
    debug!(path = %path.display(), "configuration resolved");
    let cli_context = CliContext::new(config, path);

    match dispatch(&cli, &cli_context).await {
        Ok(()) => {
            debug!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}

use anyhow::Result;

use super::chat::cmd_chat;
use super::config::cmd_config;
use super::metrics::cmd_metrics;
use super::parse::cmd_parse;
use super::search::cmd_search;
use super::tools::cmd_tools;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use crate::cli::env::CliArgs;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Chat(args) => cmd_chat(args, ctx, cli.output).await,
        Commands::Tools(args) => cmd_tools(args, cli.output).await,
        Commands::Parse(args) => cmd_parse(args, cli.output).await,
        Commands::Search(args) => cmd_search(args, ctx, cli.output).await,
        Commands::Config(args) => cmd_config(args, ctx, cli.output).await,
        Commands::Metrics => cmd_metrics().await,
    }
}

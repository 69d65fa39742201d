use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;

use marketscout_cli::Config;

use crate::cli::context::CliContext;
use crate::cli::output::{print_value, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration, secrets redacted
    Show,

    /// Validate the configuration file
    Validate,

    /// Print the worst-case latency bound implied by the engine settings
    Bounds,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let path = ctx.config_path();
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let shown = ctx.config().redacted();
            match output {
                OutputFormat::Human => {
                    println!("Effective configuration ({}):", path.display());
                    print!("{}", serde_yaml::to_string(&shown)?);
                }
                other => print_value(other, &shown)?,
            }
        }
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                let raw = fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_yaml::from_str::<Config>(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
        ConfigAction::Bounds => {
            let engine = &ctx.config().engine;
            println!("max turns:              {}", engine.max_turns);
            println!(
                "worst-case tool wait:   {:?}",
                engine.worst_case_tool_latency()
            );
            println!("llm timeout per turn:   {:?}", engine.llm_timeout());
            println!("worst-case request:     {:?}", engine.worst_case_latency());
        }
    }
    Ok(())
}

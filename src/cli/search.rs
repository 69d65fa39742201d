use anyhow::{bail, Result};
use clap::Args;
use serde_json::json;

use agent_core::{NoProgress, ToolCall, ToolExecutor, ToolResult};

use crate::cli::context::CliContext;
use crate::cli::output::{print_value, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Queries; several may be joined with `;`
    #[arg(required = true)]
    pub query: Vec<String>,
}

pub async fn cmd_search(args: SearchArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    if ctx.config().search.api_key.is_none() {
        bail!("No search API key configured; set SERPER_API_KEY or search.api_key");
    }
    let dispatcher = ctx.dispatcher()?;
    let call = ToolCall::new("external_search", json!({ "query": args.query.join("; ") }));
    let result = dispatcher.execute(&call, &NoProgress).await?;

    match output {
        OutputFormat::Human => println!("{}", result.render()),
        other => print_value(other, &result.to_value())?,
    }
    if let ToolResult::Err { error, detail } = &result {
        bail!("search failed [{error}]: {detail}");
    }
    Ok(())
}

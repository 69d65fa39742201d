use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use tokio::fs;
use tokio::io::AsyncReadExt;

use agent_core::{clean_response, try_parse_tool_call};

use crate::cli::output::{print_value, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ParseArgs {
    /// File holding raw model output (stdin when omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

pub async fn cmd_parse(args: ParseArgs, output: OutputFormat) -> Result<()> {
    let raw = match args.file.as_ref() {
        Some(path) => fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let cleaned = clean_response(&raw);
    let call = try_parse_tool_call(&cleaned);
    match output {
        OutputFormat::Human => match &call {
            Some(call) => println!("tool call: {call}"),
            None => println!("final answer:\n{cleaned}"),
        },
        other => print_value(
            other,
            &json!({
                "toolCall": call,
                "cleaned": cleaned,
            }),
        )?,
    }
    Ok(())
}

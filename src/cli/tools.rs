use anyhow::Result;
use clap::Args;

use agent_core::prompt::system_prompt;
use agent_core::ToolRegistry;

use crate::cli::output::{print_value, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ToolsArgs {
    /// Print the full system prompt instead of the catalog table
    #[arg(long)]
    pub prompt: bool,
}

pub async fn cmd_tools(args: ToolsArgs, output: OutputFormat) -> Result<()> {
    let registry = ToolRegistry::with_builtin_tools();
    if args.prompt {
        println!("{}", system_prompt(&registry));
        return Ok(());
    }
    match output {
        OutputFormat::Human => {
            println!("{:<20} {:<24} {:<28}", "Tool", "Label", "Required");
            println!("{}", "-".repeat(72));
            for entry in registry.list() {
                println!(
                    "{:<20} {:<24} {:<28}",
                    entry.kind.name(),
                    entry.label,
                    entry.required_fields.join(", ")
                );
            }
        }
        other => print_value(other, &registry.list())?,
    }
    Ok(())
}

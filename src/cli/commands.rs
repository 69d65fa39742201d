use clap::Subcommand;

use super::chat::ChatArgs;
use super::config::ConfigArgs;
use super::parse::ParseArgs;
use super::search::SearchArgs;
use super::tools::ToolsArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Send one message through the full agent loop
    Chat(ChatArgs),

    /// Show the tool catalog the model is given
    Tools(ToolsArgs),

    /// Extract a tool call from model output text
    Parse(ParseArgs),

    /// Run the external web-search tool directly
    Search(SearchArgs),

    /// Show the effective configuration
    Config(ConfigArgs),

    /// Print engine counters in Prometheus text format
    Metrics,
}

//! Prompt templates for the conversation tool loop.

use crate::model::{ToolCall, ToolResult};
use crate::registry::ToolRegistry;

const ROLE: &str = "You are a shopping research assistant working inside a live marketplace tab. \
Your goal is to recommend concrete products the user can buy, with direct product URLs.";

const CALL_FORMAT: &str = "When you need a tool, reply with ONLY one fenced JSON block:\n\
```json\n{\"tool\": \"tool_name\", \"args\": {\"field\": \"value\"}}\n```\n\
Call one tool per reply. When you have enough information, answer in plain text without any JSON.";

/// Role, tool catalog and call format.
pub fn system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "{ROLE}\n\n## Available tools\n{}\n\n## Tool call format\n{CALL_FORMAT}",
        registry.prompt_for_llm()
    )
}

/// First prompt of a request. `history` is `(role, content)` in order.
pub fn initial_prompt(system: &str, history: &[(String, String)], user_text: &str) -> String {
    let mut prompt = String::from(system);
    if !history.is_empty() {
        prompt.push_str("\n\n## Conversation so far\n");
        for (role, content) in history {
            prompt.push_str(&format!("{role}: {content}\n"));
        }
    }
    prompt.push_str(&format!("\n## User request\n{user_text}"));
    prompt
}

pub fn tool_success(call: &ToolCall, result: &ToolResult) -> String {
    format!(
        "Tool `{}` returned:\n\n{}\n\nContinue with the next step. Call another tool if you still need data, otherwise give the final answer.",
        call.name,
        result.render()
    )
}

pub fn tool_failure(call: &ToolCall, result: &ToolResult) -> String {
    format!(
        "Tool `{}` failed:\n\n{}\n\nTry a different approach or a different tool. If the data you already have is enough, give the final answer.",
        call.name,
        result.render()
    )
}

pub fn duplicate_call(call: &ToolCall) -> String {
    format!(
        "You already called `{call}` in this request and its result is above. Do not repeat it. \
Proceed to the next step or give the final answer."
    )
}

/// Appended to the last response when the turn budget runs out.
pub fn max_turns_warning(max_turns: u32) -> String {
    format!("Stopped after {max_turns} turns without a final answer; this response may be incomplete.")
}

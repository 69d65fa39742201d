//! Conversation loop controller.
//!
//! Each turn: send the prompt, clean the reply, look for a tool call. No
//! tool call means the reply is the answer. Otherwise the call runs (unless
//! it already ran in this invocation) and its result becomes the next prompt.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{LoopObserver, LoopOutcome, LoopStatus};
use crate::config::EngineConfig;
use crate::dedup::{DedupCache, DedupKey};
use crate::dispatcher::{ToolExecutor, ToolProgress};
use crate::errors::AgentError;
use crate::llm_provider::LlmTextInterface;
use crate::metrics;
use crate::model::{ConversationTurn, ToolCall, ToolResult};
use crate::prompt;
use crate::tool_call::{clean_response, try_parse_tool_call};

/// Forwards pipeline progress to the loop observer, tagged with the call.
struct ObserverProgress<'a> {
    observer: &'a dyn LoopObserver,
    call: &'a ToolCall,
}

impl ToolProgress for ObserverProgress<'_> {
    fn on_progress(&self, current: usize, total: usize, target: &str) {
        self.observer
            .on_tool_progress(self.call, current, total, target);
    }
}

/// Per-invocation state. Discarded when `run` returns.
#[derive(Default)]
struct LoopState {
    turns: Vec<ConversationTurn>,
    dedup: DedupCache,
    tools_executed: u32,
    last_response: String,
    last_good: Option<ToolResult>,
}

impl LoopState {
    fn finish(self, status: LoopStatus, answer: String, warning: Option<String>) -> LoopOutcome {
        LoopOutcome {
            status,
            answer,
            warning,
            tools_executed: self.tools_executed,
            skipped_duplicates: self.dedup.skipped(),
            turns: self.turns,
        }
    }

    fn cancelled(self) -> LoopOutcome {
        metrics::record_loop_cancelled();
        info!(turns = self.turns.len(), "conversation loop cancelled");
        let answer = self.partial_answer();
        self.finish(
            LoopStatus::Cancelled,
            answer,
            Some("Request cancelled before a final answer.".to_string()),
        )
    }

    /// Prose of the last reply, or the last good tool report if the reply
    /// was nothing but a tool call.
    fn partial_answer(&self) -> String {
        let prose = self
            .last_response
            .split("```")
            .next()
            .unwrap_or_default()
            .split('{')
            .next()
            .unwrap_or_default()
            .trim();
        if !prose.is_empty() {
            return prose.to_string();
        }
        match &self.last_good {
            Some(result) => format!("Partial results gathered so far:\n\n{}", result.render()),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationToolLoop {
    max_turns: u32,
}

impl ConversationToolLoop {
    pub fn new(max_turns: u32) -> Self {
        Self {
            max_turns: max_turns.max(1),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_turns)
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    /// Runs until a reply carries no tool call, the turn budget runs out, or
    /// `cancel` fires.
    ///
    /// Tool failures are fed back to the model. Only LLM transport failures
    /// and errors the executor refuses to contain come back as `Err`.
    pub async fn run(
        &self,
        llm: &dyn LlmTextInterface,
        tools: &dyn ToolExecutor,
        initial_prompt: &str,
        observer: &dyn LoopObserver,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, AgentError> {
        let mut state = LoopState::default();
        let mut prompt_text = initial_prompt.to_string();

        for turn in 1..=self.max_turns {
            if cancel.is_cancelled() {
                return Ok(state.cancelled());
            }

            let raw = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(state.cancelled()),
                reply = llm.respond(&state.turns, &prompt_text) => reply?,
            };
            let response = clean_response(&raw);
            let detected = try_parse_tool_call(&response);
            debug!(turn, tool = ?detected.as_ref().map(|c| c.name.as_str()), "model replied");

            state.turns.push(ConversationTurn {
                prompt_text: prompt_text.clone(),
                response_text: response.clone(),
                extracted_tool_call: detected.clone(),
            });
            state.last_response = response.clone();

            let Some(call) = detected else {
                metrics::record_loop_completed();
                info!(turns = turn, tools = state.tools_executed, "conversation loop completed");
                return Ok(state.finish(LoopStatus::Completed, response, None));
            };
            observer.on_tool_call_detected(&call);

            let key = DedupKey::for_call(&call);
            if state.dedup.lookup(&key).is_some() {
                state.dedup.note_skip();
                metrics::record_duplicate_skipped(&call.name);
                warn!(turn, tool = %call.name, key = key.as_str(), "duplicate tool call skipped");
                observer.on_duplicate_skipped(&call);
                prompt_text = prompt::duplicate_call(&call);
                continue;
            }

            let progress = ObserverProgress {
                observer,
                call: &call,
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(state.cancelled()),
                result = tools.execute(&call, &progress) => result?,
            };
            state.tools_executed += 1;
            observer.on_tool_completed(&call, &result);

            prompt_text = if result.is_success_shaped() {
                state.last_good = Some(result.clone());
                prompt::tool_success(&call, &result)
            } else {
                prompt::tool_failure(&call, &result)
            };
            state.dedup.record(key, result);
        }

        metrics::record_max_turns_exit();
        warn!(max_turns = self.max_turns, "conversation loop hit the turn limit");
        let answer = state.partial_answer();
        Ok(state.finish(
            LoopStatus::MaxTurnsExceeded,
            answer,
            Some(prompt::max_turns_warning(self.max_turns)),
        ))
    }
}

impl Default for ConversationToolLoop {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolData;
    use serde_json::Value;

    #[test]
    fn partial_answer_prefers_prose_over_tool_json() {
        let state = LoopState {
            last_response: "Checking one more source.\n```json\n{\"tool\":\"search\",\"args\":{}}\n```"
                .to_string(),
            ..LoopState::default()
        };
        assert_eq!(state.partial_answer(), "Checking one more source.");
    }

    #[test]
    fn partial_answer_falls_back_to_last_good_result() {
        let state = LoopState {
            last_response: "{\"tool\":\"search\",\"args\":{}}".to_string(),
            last_good: Some(ToolResult::Ok {
                data: ToolData::new("3 listings found", Value::Null),
            }),
            ..LoopState::default()
        };
        assert!(state.partial_answer().contains("3 listings found"));
    }

    #[test]
    fn zero_turn_budget_is_raised_to_one() {
        assert_eq!(ConversationToolLoop::new(0).max_turns(), 1);
    }
}

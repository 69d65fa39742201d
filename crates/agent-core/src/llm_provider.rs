use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::AgentError;
use crate::model::ConversationTurn;

/// Abstraction over the text-in/text-out model surface.
///
/// `history` holds the earlier turns of the current loop invocation, oldest
/// first; implementations must present them to the model ahead of `prompt`.
/// No structure is guaranteed on the response; the conversation loop is
/// responsible for finding tool calls in it.
#[async_trait]
pub trait LlmTextInterface: Send + Sync {
    async fn respond(
        &self,
        history: &[ConversationTurn],
        prompt: &str,
    ) -> Result<String, AgentError>;
}

/// Deterministic model used for tests and offline development.
///
/// Replays the queued responses in order and records every prompt it was
/// given. Once the script runs out it keeps returning `fallback`.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    transcripts: Mutex<Vec<Vec<String>>>,
    fallback: String,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            transcripts: Mutex::new(Vec::new()),
            fallback: "Done.".to_string(),
        }
    }

    /// Response returned after the script is exhausted.
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Everything the model saw on each call: earlier prompts and replies
    /// interleaved, ending with that call's prompt.
    pub fn transcripts(&self) -> Vec<Vec<String>> {
        self.transcripts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmTextInterface for ScriptedLlm {
    async fn respond(
        &self,
        history: &[ConversationTurn],
        prompt: &str,
    ) -> Result<String, AgentError> {
        let mut transcript = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            transcript.push(turn.prompt_text.clone());
            transcript.push(turn.response_text.clone());
        }
        transcript.push(prompt.to_string());
        self.transcripts.lock().push(transcript);
        self.prompts.lock().push(prompt.to_string());
        let next = self.responses.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

use std::time::Duration;

use agent_core::{AgentError, ConversationTurn, LlmTextInterface};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmSettings;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn from_settings(settings: &LlmSettings, timeout: Duration) -> Self {
        Self {
            api_keys: settings.api_keys.clone(),
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
            temperature: settings.temperature,
            timeout,
        }
    }
}

/// Text-in/text-out client for any OpenAI-compatible `chat/completions` API.
pub struct OpenAiTextClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiTextClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        if config.api_keys.is_empty() {
            return Err(AgentError::invalid_request(
                "missing LLM API key; set MARKETSCOUT_LLM_API_KEY or llm.api_keys",
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Replays the loop's earlier turns as alternating user/assistant
    /// messages so the first prompt (system text and user request) stays in
    /// view on every call.
    fn request_body(&self, history: &[ConversationTurn], prompt: &str) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            messages.push(ChatMessage::new("user", &turn.prompt_text));
            messages.push(ChatMessage::new("assistant", &turn.response_text));
        }
        messages.push(ChatMessage::new("user", prompt));
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages,
        }
    }
}

#[async_trait]
impl LlmTextInterface for OpenAiTextClient {
    async fn respond(
        &self,
        history: &[ConversationTurn],
        prompt: &str,
    ) -> Result<String, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let body = self.request_body(history, prompt);
        let mut last_error: Option<AgentError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let response = match self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::llm(format!("llm request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = rate_limit_message(&text);
                    warn!(
                        target: "llm",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "LLM rate limited; switching API key"
                    );
                    last_error = Some(AgentError::llm(friendly));
                    continue;
                }
                return Err(AgentError::llm(format!("llm returned {status}: {text}")));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| AgentError::llm(format!("llm response invalid: {err}")))?;
            if let Some(usage) = &response.usage {
                debug!(
                    target: "llm",
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "llm round trip finished"
                );
            }
            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_ref())
                .and_then(ChatCompletionContent::as_text)
                .ok_or_else(|| AgentError::llm("llm response missing content"));
        }

        Err(last_error.unwrap_or_else(|| AgentError::llm("LLM request exhausted all API keys")))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatMessage {
    fn new(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("LLM rate limit exceeded: {}", message.trim());
        }
    }
    "LLM rate limit exceeded; please retry later.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(keys: &[&str]) -> OpenAiConfig {
        OpenAiConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            model: "test-model".into(),
            api_base: "http://127.0.0.1:9".into(),
            temperature: 0.2,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn requires_at_least_one_key() {
        let err = OpenAiTextClient::new(config(&[])).err().unwrap();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
        assert!(OpenAiTextClient::new(config(&["k"])).is_ok());
    }

    #[test]
    fn later_requests_resend_the_earlier_turns() {
        let client = OpenAiTextClient::new(config(&["k"])).unwrap();
        let history = vec![ConversationTurn {
            prompt_text: "You are a shopping assistant.\n## User request\nfind a kettle".into(),
            response_text: "```json\n{\"tool\": \"list_extract\", \"args\": {}}\n```".into(),
            extracted_tool_call: None,
        }];

        let body = serde_json::to_value(
            client.request_body(&history, "Tool `list_extract` failed: PageUnavailable"),
        )
        .unwrap();
        let messages = body["messages"].as_array().unwrap();
        let roles: Vec<_> = messages.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        let first = messages[0]["content"].as_str().unwrap();
        assert!(first.contains("You are a shopping assistant."));
        assert!(first.contains("find a kettle"));
        assert!(messages[2]["content"].as_str().unwrap().contains("PageUnavailable"));
        assert_eq!(body["model"], "test-model");
    }

    #[test]
    fn first_request_is_a_single_user_message() {
        let client = OpenAiTextClient::new(config(&["k"])).unwrap();
        let body = serde_json::to_value(client.request_body(&[], "hello")).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn content_parts_are_joined() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":[{"text":"a"},{"type":"image"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        let text = response.choices[0].message.content.as_ref().unwrap().as_text();
        assert_eq!(text.as_deref(), Some("a\nb"));
    }

    #[test]
    fn rate_limit_message_reads_the_error_envelope() {
        assert_eq!(
            rate_limit_message(r#"{"error":{"message":" quota exhausted "}}"#),
            "LLM rate limit exceeded: quota exhausted"
        );
        assert!(rate_limit_message("<html>").contains("retry later"));
    }
}

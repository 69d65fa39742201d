use thiserror::Error;

use page_agent::PageError;

/// Errors that escape the engine to the orchestrating caller.
///
/// Per-call, per-target and per-query failures are reported as
/// [`crate::ToolResult`] values instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Raised when a request is malformed or missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),

    /// The LLM text interface could not produce a response.
    #[error("llm request failed: {0}")]
    Llm(String),

    /// An outbound collaborator (search API, HTTP) failed.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The foreground execution context disappeared.
    #[error("execution context lost: {0}")]
    ContextLost(String),

    #[error("request cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

impl From<PageError> for AgentError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::ContextClosed(ctx) => AgentError::ContextLost(ctx),
            other => AgentError::Upstream(other.to_string()),
        }
    }
}

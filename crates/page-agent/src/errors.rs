use thiserror::Error;

use marketscout_core_types::ScoutError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    /// The page agent is not injected yet; always worth retrying.
    #[error("page agent not yet loaded")]
    NotYetLoaded,
    #[error("messaging channel error: {0}")]
    Channel(String),
    #[error("execution context {0} is closed")]
    ContextClosed(String),
    #[error("page surface unavailable: {0}")]
    Unavailable(String),
    #[error("page agent did not respond within {timeout_ms}ms")]
    AgentUnresponsive { timeout_ms: u64 },
    #[error("navigation did not complete within {timeout_ms}ms")]
    NavigationTimeout { timeout_ms: u64 },
    #[error("extraction failed: {0}")]
    Extraction(String),
}

impl PageError {
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Whether a readiness poll should keep going after seeing this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PageError::NotYetLoaded | PageError::Channel(_))
    }
}

impl From<PageError> for ScoutError {
    fn from(err: PageError) -> Self {
        ScoutError::new(err.to_string())
    }
}

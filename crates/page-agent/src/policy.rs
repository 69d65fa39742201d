use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Poll intervals and timeouts used by every readiness check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    pub agent_poll_ms: u64,
    pub content_poll_ms: u64,
    pub settle_ms: u64,
    pub agent_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub content_timeout_ms: u64,
    /// Agent wait on a freshly opened per-target context.
    pub target_agent_timeout_ms: u64,
}

impl ReadinessPolicy {
    pub fn agent_poll(&self) -> Duration {
        Duration::from_millis(self.agent_poll_ms)
    }

    pub fn content_poll(&self) -> Duration {
        Duration::from_millis(self.content_poll_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_millis(self.agent_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn target_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.target_agent_timeout_ms)
    }

    /// Longest a single search-style tool can spend waiting on the page.
    pub fn worst_case_page_wait(&self) -> Duration {
        self.navigation_timeout() + self.settle() + self.agent_timeout() + self.content_timeout()
    }

    /// Longest a single deep-extract target can spend waiting on the page.
    pub fn worst_case_target_wait(&self) -> Duration {
        self.navigation_timeout() + self.settle() + self.target_agent_timeout()
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            agent_poll_ms: 200,
            content_poll_ms: 500,
            settle_ms: 500,
            agent_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            content_timeout_ms: 10_000,
            target_agent_timeout_ms: 15_000,
        }
    }
}

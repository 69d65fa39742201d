//! Tunables for the execution engine.

use std::time::Duration;

use page_agent::ReadinessPolicy;
use serde::{Deserialize, Serialize};

use crate::model::ToolKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model round trips allowed per request.
    /// Default: 15
    pub max_turns: u32,

    pub readiness: ReadinessPolicy,

    /// Hard cap on listing items returned by `list_extract`.
    /// Default: 1000
    pub max_listing_items: usize,

    /// Targets accepted by one `deep_extract_batch` call.
    /// Default: 50
    pub max_batch_targets: usize,

    /// Sub-queries fanned out by one `external_search` call.
    /// Default: 5
    pub max_external_queries: usize,

    /// Predicate id asked of the page agent on search result pages.
    pub listing_predicate: String,

    /// Upper bound of one LLM round trip, enforced by the HTTP client.
    /// Default: 120000
    pub llm_timeout_ms: u64,

    pub limits: GuardrailLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: 15,
            readiness: ReadinessPolicy::default(),
            max_listing_items: 1000,
            max_batch_targets: 50,
            max_external_queries: 5,
            listing_predicate: "listing".to_string(),
            llm_timeout_ms: 120_000,
            limits: GuardrailLimits::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set max turns.
    pub fn max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    /// Builder: replace the readiness policy.
    pub fn readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    /// Builder: replace the guardrail ceilings.
    pub fn limits(mut self, limits: GuardrailLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    /// Longest a single tool call can take.
    pub fn worst_case_tool_latency(&self) -> Duration {
        let batch = self.readiness.worst_case_target_wait() * self.max_batch_targets as u32;
        batch.max(self.readiness.worst_case_page_wait())
    }

    /// There is no global request timeout: a request is bounded by
    /// `max_turns` rounds of one LLM call plus one tool call.
    pub fn worst_case_latency(&self) -> Duration {
        (self.llm_timeout() + self.worst_case_tool_latency()) * self.max_turns
    }
}

/// Per-request ceilings enforced by [`crate::InvocationGuardrail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailLimits {
    pub search: u32,
    pub list_extract: u32,
    pub deep_extract_batch: u32,
    pub external_search: u32,
    /// Tool executions allowed across all tools.
    pub max_loops: u32,
}

impl GuardrailLimits {
    pub fn ceiling(&self, kind: ToolKind) -> u32 {
        match kind {
            ToolKind::Search => self.search,
            ToolKind::ListExtract => self.list_extract,
            ToolKind::DeepExtractBatch => self.deep_extract_batch,
            ToolKind::ExternalSearch => self.external_search,
        }
    }
}

impl Default for GuardrailLimits {
    fn default() -> Self {
        Self {
            search: 2,
            list_extract: 2,
            deep_extract_batch: 2,
            external_search: 5,
            max_loops: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_turns, 15);
        assert_eq!(config.limits.ceiling(ToolKind::ExternalSearch), 5);
        assert_eq!(config.limits.max_loops, 5);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new().max_turns(3);
        assert_eq!(config.max_turns, 3);
    }

    #[test]
    fn worst_case_latency_scales_with_turns() {
        let one = EngineConfig::new().max_turns(1).worst_case_latency();
        let three = EngineConfig::new().max_turns(3).worst_case_latency();
        assert_eq!(one * 3, three);
        assert!(one >= EngineConfig::default().llm_timeout());
    }
}

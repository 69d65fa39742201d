//! Per-request usage ceilings.
//!
//! [`InvocationGuardrail`] wraps any [`ToolExecutor`] and counts calls per
//! tool plus a global loop count. Over a ceiling it answers with a
//! success-shaped [`ToolResult::LimitReached`] carrying the last good data
//! for that tool and never calls the wrapped executor. It is independent of
//! the loop's dedup cache: the orchestrator builds a fresh one per request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GuardrailLimits;
use crate::dispatcher::{ToolExecutor, ToolProgress};
use crate::errors::AgentError;
use crate::metrics;
use crate::model::{ToolCall, ToolData, ToolKind, ToolResult};

/// Calls admitted so far in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageCounters {
    pub per_tool: HashMap<ToolKind, u32>,
    pub loops: u32,
}

impl UsageCounters {
    pub fn count(&self, kind: ToolKind) -> u32 {
        self.per_tool.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Default)]
struct GuardState {
    usage: UsageCounters,
    last_good: HashMap<ToolKind, ToolData>,
}

pub struct InvocationGuardrail {
    inner: Arc<dyn ToolExecutor>,
    limits: GuardrailLimits,
    state: Mutex<GuardState>,
}

impl InvocationGuardrail {
    pub fn new(inner: Arc<dyn ToolExecutor>, limits: GuardrailLimits) -> Self {
        Self {
            inner,
            limits,
            state: Mutex::new(GuardState::default()),
        }
    }

    pub fn usage(&self) -> UsageCounters {
        self.state.lock().usage.clone()
    }

    pub fn limits(&self) -> &GuardrailLimits {
        &self.limits
    }

    /// Counts the call if it fits under both ceilings, otherwise returns the
    /// substitute result.
    fn admit(&self, kind: ToolKind) -> Result<(), ToolResult> {
        let mut state = self.state.lock();
        let used = state.usage.count(kind);
        let ceiling = self.limits.ceiling(kind);
        let detail = if state.usage.loops >= self.limits.max_loops {
            Some(format!(
                "tool loop ceiling reached ({}/{} tool calls this request)",
                state.usage.loops, self.limits.max_loops
            ))
        } else if used >= ceiling {
            Some(format!(
                "{kind} limit reached ({used}/{ceiling} calls this request)"
            ))
        } else {
            None
        };

        if let Some(detail) = detail {
            return Err(ToolResult::LimitReached {
                detail,
                last_good: state.last_good.get(&kind).cloned(),
            });
        }
        *state.usage.per_tool.entry(kind).or_insert(0) += 1;
        state.usage.loops += 1;
        Ok(())
    }
}

#[async_trait]
impl ToolExecutor for InvocationGuardrail {
    async fn execute(
        &self,
        call: &ToolCall,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, AgentError> {
        // Unknown tools are not counted; the inner executor reports them.
        let Some(kind) = call.kind() else {
            return self.inner.execute(call, progress).await;
        };

        if let Err(substitute) = self.admit(kind) {
            metrics::record_guardrail_substitution(kind.name());
            warn!(tool = %kind, "guardrail substituted a limit-reached result");
            return Ok(substitute);
        }

        let result = self.inner.execute(call, progress).await?;
        if let ToolResult::Ok { data } = &result {
            self.state.lock().last_good.insert(kind, data.clone());
        }
        debug!(tool = %kind, usage = ?self.usage(), "guardrail counted call");
        Ok(result)
    }
}

//! Outcome and observer types for the conversation tool loop.

use serde::{Deserialize, Serialize};

use crate::model::{ConversationTurn, ToolCall, ToolResult};

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// A turn produced no tool call; its text is the answer.
    Completed,
    /// The turn budget ran out; the answer is best effort.
    MaxTurnsExceeded,
    /// The caller asked to stop.
    Cancelled,
}

/// Result of one loop invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopOutcome {
    pub status: LoopStatus,
    /// Final or partial answer text.
    pub answer: String,
    /// Visible warning for non-normal endings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Turn log of this invocation.
    pub turns: Vec<ConversationTurn>,
    /// Tool calls actually executed (duplicates excluded).
    pub tools_executed: u32,
    /// Tool calls answered from the dedup cache instead of executed.
    pub skipped_duplicates: u32,
}

impl LoopOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == LoopStatus::Completed
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}

/// Side-channel callbacks, invoked synchronously at fixed points of a turn.
///
/// Observers must not block; they only see the loop, they never steer it.
pub trait LoopObserver: Send + Sync {
    fn on_tool_call_detected(&self, _call: &ToolCall) {}

    fn on_tool_progress(&self, _call: &ToolCall, _current: usize, _total: usize, _target: &str) {}

    fn on_tool_completed(&self, _call: &ToolCall, _result: &ToolResult) {}

    fn on_duplicate_skipped(&self, _call: &ToolCall) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LoopObserver for NoopObserver {}

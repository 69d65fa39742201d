//! One user request, end to end.
//!
//! The orchestrator owns the session registry and the status bus, claims the
//! session, builds the first prompt from history, wraps the tools in a fresh
//! [`InvocationGuardrail`] and runs the conversation loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use agent_core::prompt::{initial_prompt, system_prompt};
use agent_core::{
    ConversationToolLoop, EngineConfig, InvocationGuardrail, LlmTextInterface, LoopStatus,
    ToolExecutor, ToolRegistry, UsageCounters,
};
use marketscout_core_types::{RequestId, SessionId};

use crate::errors::RequestError;
use crate::events::{emit, BusObserver, StatusBus, StatusEvent};
use crate::metrics;
use crate::sessions::{Role, SessionRegistry};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub request_id: String,
    pub status: LoopStatus,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub turns: usize,
    pub tools_executed: u32,
    pub skipped_duplicates: u32,
    pub usage: UsageCounters,
}

pub struct Orchestrator {
    llm: Arc<dyn LlmTextInterface>,
    tools: Arc<dyn ToolExecutor>,
    config: EngineConfig,
    system_prompt: String,
    sessions: Arc<SessionRegistry>,
    bus: Arc<StatusBus>,
}

/// Releases the session claim however the request ends, including when the
/// request future is dropped mid-flight.
struct ProcessingClaim<'a> {
    sessions: &'a SessionRegistry,
    session: &'a SessionId,
}

impl Drop for ProcessingClaim<'_> {
    fn drop(&mut self) {
        self.sessions.finalize(self.session);
    }
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmTextInterface>,
        tools: Arc<dyn ToolExecutor>,
        config: EngineConfig,
        sessions: Arc<SessionRegistry>,
        bus: Arc<StatusBus>,
    ) -> Self {
        Self {
            llm,
            tools,
            config,
            system_prompt: system_prompt(&ToolRegistry::with_builtin_tools()),
            sessions,
            bus,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn bus(&self) -> &Arc<StatusBus> {
        &self.bus
    }

    pub async fn handle_message(
        &self,
        session: &SessionId,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        let text = text.trim();
        if text.is_empty() {
            metrics::record_request("rejected");
            return Err(RequestError::EmptyMessage.into());
        }
        if let Err(err) = self.sessions.begin_processing(session) {
            metrics::record_request("rejected");
            return Err(err.into());
        }
        let _claim = ProcessingClaim {
            sessions: &self.sessions,
            session,
        };

        let request_id = RequestId::new();
        let span = info_span!("request", session = %session, request = %request_id);
        self.run_claimed(session, text, request_id, cancel)
            .instrument(span)
            .await
    }

    async fn run_claimed(
        &self,
        session: &SessionId,
        text: &str,
        request_id: RequestId,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        let history = self.sessions.history(session);
        self.sessions.add_message(session, Role::User, text);
        let prompt = initial_prompt(&self.system_prompt, &history, text);

        let guard = InvocationGuardrail::new(self.tools.clone(), self.config.limits.clone());
        let observer = BusObserver::new(self.bus.clone(), self.sessions.clone(), session.clone());
        info!(history = history.len(), "request started");

        let outcome = ConversationToolLoop::from_config(&self.config)
            .run(self.llm.as_ref(), &guard, &prompt, &observer, cancel)
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "request failed");
                metrics::record_request("failed");
                emit(
                    &self.bus,
                    StatusEvent::ResponseError {
                        session_id: session.to_string(),
                        message: err.to_string(),
                    },
                );
                return Err(err).context("conversation loop failed");
            }
        };

        let text = match &outcome.warning {
            Some(warning) if !outcome.answer.is_empty() => {
                format!("{}\n\n{warning}", outcome.answer)
            }
            Some(warning) => warning.clone(),
            None => outcome.answer.clone(),
        };
        if outcome.status != LoopStatus::Cancelled {
            self.sessions.set_response(session, &text);
        }
        metrics::record_request(match outcome.status {
            LoopStatus::Completed => "completed",
            LoopStatus::MaxTurnsExceeded => "max_turns",
            LoopStatus::Cancelled => "cancelled",
        });
        emit(
            &self.bus,
            StatusEvent::ResponseComplete {
                session_id: session.to_string(),
                text: text.clone(),
                warning: outcome.warning.clone(),
            },
        );
        info!(
            status = ?outcome.status,
            turns = outcome.turn_count(),
            tools = outcome.tools_executed,
            skipped_duplicates = outcome.skipped_duplicates,
            "request finished"
        );

        Ok(Reply {
            request_id: request_id.to_string(),
            status: outcome.status,
            turns: outcome.turn_count(),
            tools_executed: outcome.tools_executed,
            skipped_duplicates: outcome.skipped_duplicates,
            warning: outcome.warning,
            text,
            usage: guard.usage(),
        })
    }
}

//! Display-only status events and the loop observer that emits them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use agent_core::{LoopObserver, ToolCall, ToolResult};
use marketscout_core_types::SessionId;
use marketscout_event_bus::{EventBus, InMemoryBus};

use crate::sessions::{SessionRegistry, ToolProgressState};

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum StatusEvent {
    #[serde(rename_all = "camelCase")]
    ToolCall {
        session_id: String,
        name: String,
        args: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolProgress {
        session_id: String,
        name: String,
        current: usize,
        total: usize,
        target: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        session_id: String,
        name: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseComplete {
        session_id: String,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    ResponseError { session_id: String, message: String },
}

pub type StatusBus = InMemoryBus<StatusEvent>;

/// Publishes a status event; a missing or lagging viewer never fails the request.
pub fn emit(bus: &StatusBus, event: StatusEvent) {
    if let Err(err) = bus.publish(event) {
        debug!(?err, "status event dropped");
    }
}

/// Mirrors loop callbacks onto the status bus and the session's progress slot.
pub struct BusObserver {
    bus: Arc<StatusBus>,
    sessions: Arc<SessionRegistry>,
    session: SessionId,
}

impl BusObserver {
    pub fn new(bus: Arc<StatusBus>, sessions: Arc<SessionRegistry>, session: SessionId) -> Self {
        Self {
            bus,
            sessions,
            session,
        }
    }

    fn session_id(&self) -> String {
        self.session.to_string()
    }
}

impl LoopObserver for BusObserver {
    fn on_tool_call_detected(&self, call: &ToolCall) {
        self.sessions.update_progress(
            &self.session,
            ToolProgressState {
                tool: call.name.clone(),
                current: 0,
                total: 0,
                target: None,
            },
        );
        emit(
            &self.bus,
            StatusEvent::ToolCall {
                session_id: self.session_id(),
                name: call.name.clone(),
                args: Value::Object(call.args.clone()),
            },
        );
    }

    fn on_tool_progress(&self, call: &ToolCall, current: usize, total: usize, target: &str) {
        self.sessions.update_progress(
            &self.session,
            ToolProgressState {
                tool: call.name.clone(),
                current,
                total,
                target: Some(target.to_string()),
            },
        );
        emit(
            &self.bus,
            StatusEvent::ToolProgress {
                session_id: self.session_id(),
                name: call.name.clone(),
                current,
                total,
                target: target.to_string(),
            },
        );
    }

    fn on_tool_completed(&self, call: &ToolCall, result: &ToolResult) {
        self.sessions.clear_progress(&self.session);
        emit(
            &self.bus,
            StatusEvent::ToolResult {
                session_id: self.session_id(),
                name: call.name.clone(),
                success: result.is_success_shaped(),
                error: result.error_kind().map(|kind| kind.to_string()),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_with_camel_case_tags() {
        let event = StatusEvent::ToolProgress {
            session_id: "s".into(),
            name: "deep_extract_batch".into(),
            current: 1,
            total: 3,
            target: "https://shop.test/a".into(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "toolProgress",
                "sessionId": "s",
                "name": "deep_extract_batch",
                "current": 1,
                "total": 3,
                "target": "https://shop.test/a",
            })
        );
    }

    #[tokio::test]
    async fn observer_tracks_progress_and_publishes() {
        let bus = StatusBus::new(8);
        let mut rx = bus.subscribe();
        let sessions = Arc::new(SessionRegistry::new());
        let id = SessionId::from("s-1");
        sessions.get_or_create(&id);
        let observer = BusObserver::new(bus.clone(), sessions.clone(), id.clone());
        let call = ToolCall::new("deep_extract_batch", json!({"urls": ["https://shop.test/a"]}));

        observer.on_tool_call_detected(&call);
        observer.on_tool_progress(&call, 0, 1, "https://shop.test/a");
        let progress = sessions.snapshot(&id).unwrap().progress.unwrap();
        assert_eq!(progress.target.as_deref(), Some("https://shop.test/a"));

        observer.on_tool_completed(&call, &ToolResult::ok("done", json!({})));
        assert!(sessions.snapshot(&id).unwrap().progress.is_none());

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, StatusEvent::ToolCall { .. }));
        let _ = rx.recv().await.unwrap();
        let last = rx.recv().await.unwrap();
        assert!(matches!(last, StatusEvent::ToolResult { success: true, .. }));
    }

    #[test]
    fn publishing_without_viewers_is_harmless() {
        let bus = StatusBus::new(4);
        emit(
            &bus,
            StatusEvent::ResponseError {
                session_id: "s".into(),
                message: "boom".into(),
            },
        );
        assert_eq!(bus.subscriber_count(), 0);
    }
}

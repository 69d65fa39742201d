//! Per-session conversation state, owned by one orchestrator.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use marketscout_core_types::SessionId;

use crate::errors::RequestError;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// In-flight tool progress, replayed to viewers that reconnect mid-request.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ToolProgressState {
    pub tool: String,
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionState {
    pub messages: Vec<StoredMessage>,
    pub processing: bool,
    pub progress: Option<ToolProgressState>,
    pub current_response: String,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            processing: false,
            progress: None,
            current_response: String::new(),
            last_activity: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub messages: Vec<StoredMessage>,
    pub processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ToolProgressState>,
    pub last_activity: DateTime<Utc>,
}

/// Session identity to session state.
///
/// Each entry is only mutated through short, synchronous critical sections;
/// nothing here is held across an await.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Creates the session on first use and returns a copy of its state.
    pub fn get_or_create(&self, session: &SessionId) -> SessionState {
        self.sessions
            .entry(session.clone())
            .or_insert_with(SessionState::new)
            .clone()
    }

    /// Claims the session for one request. A session runs one request at a time.
    pub fn begin_processing(&self, session: &SessionId) -> Result<(), RequestError> {
        let mut state = self
            .sessions
            .entry(session.clone())
            .or_insert_with(SessionState::new);
        if state.processing {
            return Err(RequestError::AlreadyProcessing(session.clone()));
        }
        state.processing = true;
        state.current_response.clear();
        state.touch();
        Ok(())
    }

    pub fn add_message(&self, session: &SessionId, role: Role, content: impl Into<String>) {
        let mut state = self
            .sessions
            .entry(session.clone())
            .or_insert_with(SessionState::new);
        state.messages.push(StoredMessage {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        state.touch();
    }

    /// `(role, content)` pairs in order, as fed into the first prompt.
    pub fn history(&self, session: &SessionId) -> Vec<(String, String)> {
        self.sessions
            .get(session)
            .map(|state| {
                state
                    .messages
                    .iter()
                    .map(|m| (m.role.as_str().to_string(), m.content.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_response(&self, session: &SessionId, text: &str) {
        if let Some(mut state) = self.sessions.get_mut(session) {
            state.current_response = text.to_string();
            state.touch();
        }
    }

    pub fn update_progress(&self, session: &SessionId, progress: ToolProgressState) {
        if let Some(mut state) = self.sessions.get_mut(session) {
            state.progress = Some(progress);
            state.touch();
        }
    }

    pub fn clear_progress(&self, session: &SessionId) {
        if let Some(mut state) = self.sessions.get_mut(session) {
            state.progress = None;
        }
    }

    /// Moves the accumulated response into history and releases the session.
    pub fn finalize(&self, session: &SessionId) {
        if let Some(mut state) = self.sessions.get_mut(session) {
            let response = std::mem::take(&mut state.current_response);
            if !response.is_empty() {
                state.messages.push(StoredMessage {
                    role: Role::Assistant,
                    content: response,
                    timestamp: Utc::now(),
                });
            }
            state.processing = false;
            state.progress = None;
            state.touch();
        }
    }

    /// Forgets the history. An in-flight request keeps its claim.
    pub fn clear(&self, session: &SessionId) {
        if let Some(mut state) = self.sessions.get_mut(session) {
            let processing = state.processing;
            *state = SessionState::new();
            state.processing = processing;
            debug!(session = %session, "session history cleared");
        }
    }

    pub fn snapshot(&self, session: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(session).map(|state| SessionSnapshot {
            session_id: session.to_string(),
            messages: state.messages.clone(),
            processing: state.processing,
            progress: state.progress.clone(),
            last_activity: state.last_activity,
        })
    }
}

use thiserror::Error;

use marketscout_core_types::SessionId;

/// Request-level rejections raised before the engine runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("message text is empty")]
    EmptyMessage,

    #[error("session {0} is already processing a message")]
    AlreadyProcessing(SessionId),
}

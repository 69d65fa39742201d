use serde::{Deserialize, Serialize};

/// Lifecycle of one execution context, in the order it normally advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    Opening,
    Loaded,
    AgentReady,
    Busy,
    Closed,
}

impl LifecycleState {
    /// Loaded or any later live state.
    pub fn is_loaded(self) -> bool {
        matches!(
            self,
            LifecycleState::Loaded | LifecycleState::AgentReady | LifecycleState::Busy
        )
    }
}

/// Reply to a liveness probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPing {
    pub alive: bool,
}

/// Reply to a site-specific "content present" predicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentProbe {
    pub present: bool,
    pub count: u32,
}

/// Outcome of a soft content wait. Never an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentWait {
    pub found: bool,
    pub timed_out: bool,
    pub count: u32,
    pub waited_ms: u64,
}

impl ContentWait {
    pub fn found(count: u32, waited_ms: u64) -> Self {
        Self {
            found: true,
            timed_out: false,
            count,
            waited_ms,
        }
    }

    pub fn not_found(waited_ms: u64) -> Self {
        Self {
            found: false,
            timed_out: true,
            count: 0,
            waited_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_orders_like_a_page_load() {
        assert!(LifecycleState::Opening < LifecycleState::Loaded);
        assert!(LifecycleState::Busy < LifecycleState::Closed);
        assert!(LifecycleState::AgentReady.is_loaded());
        assert!(!LifecycleState::Closed.is_loaded());
    }

    #[test]
    fn content_wait_serializes_camel_case() {
        let value = serde_json::to_value(ContentWait::not_found(2000)).unwrap();
        assert_eq!(value["timedOut"], true);
        assert_eq!(value["waitedMs"], 2000);
    }
}

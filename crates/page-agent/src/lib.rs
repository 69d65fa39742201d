//! In-page agent plumbing.
//!
//! The page agent lives inside a third-party page whose load timing is
//! unknown. This crate gives callers bounded, retryable ways to learn whether
//! the page is ready, plus a lease type that guarantees an execution context
//! is closed exactly once.

pub mod errors;
pub mod lease;
pub mod model;
pub mod policy;
pub mod ports;
pub mod readiness;

pub use errors::PageError;
pub use lease::ContextLease;
pub use model::{AgentPing, ContentProbe, ContentWait, LifecycleState};
pub use policy::ReadinessPolicy;
pub use ports::{ContextProvider, PageAgent};
pub use readiness::{
    poll_until, wait_for_agent_ready, wait_for_content_present, wait_for_navigation_complete,
    LifecycleWatch, PollError,
};

pub use marketscout_core_types::ContextId;

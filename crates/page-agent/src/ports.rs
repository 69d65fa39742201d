use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use marketscout_core_types::ContextId;

use crate::errors::PageError;
use crate::model::{AgentPing, ContentProbe, LifecycleState};

/// Request/response channel to the agent injected into one page.
///
/// Every call may fail with [`PageError::NotYetLoaded`] while the page is
/// still booting; callers treat that as retryable.
#[async_trait]
pub trait PageAgent: Send + Sync {
    async fn ping(&self, ctx: &ContextId) -> Result<AgentPing, PageError>;
    async fn check_content_present(
        &self,
        ctx: &ContextId,
        predicate: &str,
    ) -> Result<ContentProbe, PageError>;
    async fn extract_listing(&self, ctx: &ContextId) -> Result<Vec<Value>, PageError>;
    async fn extract_detail(&self, ctx: &ContextId) -> Result<Value, PageError>;
    async fn navigate_search(&self, ctx: &ContextId, keyword: &str) -> Result<(), PageError>;
    async fn navigate_to(&self, ctx: &ContextId, target: &str) -> Result<(), PageError>;
}

/// Opens, focuses and closes isolated page instances.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The foreground context that search and listing tools operate on.
    async fn current(&self) -> Result<ContextId, PageError>;
    async fn open(&self, target: &str) -> Result<ContextId, PageError>;
    async fn activate(&self, ctx: &ContextId) -> Result<(), PageError>;
    /// Must be idempotent: closing an already closed context is `Ok`.
    async fn close(&self, ctx: &ContextId) -> Result<(), PageError>;
    /// Lifecycle stream for one context. The provider publishes at least
    /// `Opening`, `Loaded` and `Closed`.
    fn lifecycle(&self, ctx: &ContextId) -> Result<watch::Receiver<LifecycleState>, PageError>;
}

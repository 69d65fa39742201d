use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use page_agent::{
    AgentPing, ContentProbe, ContextId, ContextProvider, LifecycleState, PageAgent, PageError,
};

const NOT_CONNECTED: &str = "no browser extension connected";

/// Page surface used when no browser is attached.
///
/// Every page call fails with [`PageError::Unavailable`], so page tools
/// fail per call while tools that need no page keep working.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedBrowser;

fn unavailable<T>() -> Result<T, PageError> {
    Err(PageError::Unavailable(NOT_CONNECTED.to_string()))
}

#[async_trait]
impl PageAgent for DetachedBrowser {
    async fn ping(&self, _ctx: &ContextId) -> Result<AgentPing, PageError> {
        unavailable()
    }

    async fn check_content_present(
        &self,
        _ctx: &ContextId,
        _predicate: &str,
    ) -> Result<ContentProbe, PageError> {
        unavailable()
    }

    async fn extract_listing(&self, _ctx: &ContextId) -> Result<Vec<Value>, PageError> {
        unavailable()
    }

    async fn extract_detail(&self, _ctx: &ContextId) -> Result<Value, PageError> {
        unavailable()
    }

    async fn navigate_search(&self, _ctx: &ContextId, _keyword: &str) -> Result<(), PageError> {
        unavailable()
    }

    async fn navigate_to(&self, _ctx: &ContextId, _target: &str) -> Result<(), PageError> {
        unavailable()
    }
}

#[async_trait]
impl ContextProvider for DetachedBrowser {
    async fn current(&self) -> Result<ContextId, PageError> {
        unavailable()
    }

    async fn open(&self, _target: &str) -> Result<ContextId, PageError> {
        unavailable()
    }

    async fn activate(&self, _ctx: &ContextId) -> Result<(), PageError> {
        unavailable()
    }

    async fn close(&self, _ctx: &ContextId) -> Result<(), PageError> {
        Ok(())
    }

    fn lifecycle(&self, _ctx: &ContextId) -> Result<watch::Receiver<LifecycleState>, PageError> {
        unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_page_call_is_unavailable() {
        let browser = DetachedBrowser;
        let ctx = ContextId::from("x");
        assert_eq!(
            browser.current().await,
            Err(PageError::Unavailable(NOT_CONNECTED.to_string()))
        );
        assert!(matches!(browser.ping(&ctx).await, Err(PageError::Unavailable(_))));
        assert!(browser.close(&ctx).await.is_ok());
    }
}

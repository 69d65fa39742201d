use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use page_agent::{
    wait_for_agent_ready, wait_for_content_present, AgentPing, ContentProbe, ContentWait,
    ContextId, PageAgent, PageError,
};
use serde_json::Value;
use tokio::time::Instant;

/// Agent that answers after `ready_after` pings and finds content after
/// `content_after` checks. `None` means never.
struct SlowAgent {
    pings: AtomicU32,
    checks: AtomicU32,
    ready_after: Option<u32>,
    content_after: Option<u32>,
    fatal: bool,
}

impl SlowAgent {
    fn new(ready_after: Option<u32>, content_after: Option<u32>) -> Self {
        Self {
            pings: AtomicU32::new(0),
            checks: AtomicU32::new(0),
            ready_after,
            content_after,
            fatal: false,
        }
    }
}

#[async_trait]
impl PageAgent for SlowAgent {
    async fn ping(&self, _ctx: &ContextId) -> Result<AgentPing, PageError> {
        let n = self.pings.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fatal {
            return Err(PageError::Unavailable("tab crashed".into()));
        }
        match self.ready_after {
            Some(after) if n >= after => Ok(AgentPing { alive: true }),
            _ => Err(PageError::NotYetLoaded),
        }
    }

    async fn check_content_present(
        &self,
        _ctx: &ContextId,
        _predicate: &str,
    ) -> Result<ContentProbe, PageError> {
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        match self.content_after {
            Some(after) if n >= after => Ok(ContentProbe {
                present: true,
                count: 12,
            }),
            _ => Ok(ContentProbe::default()),
        }
    }

    async fn extract_listing(&self, _ctx: &ContextId) -> Result<Vec<Value>, PageError> {
        Ok(Vec::new())
    }

    async fn extract_detail(&self, _ctx: &ContextId) -> Result<Value, PageError> {
        Ok(Value::Null)
    }

    async fn navigate_search(&self, _ctx: &ContextId, _keyword: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn navigate_to(&self, _ctx: &ContextId, _target: &str) -> Result<(), PageError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn agent_ready_retries_not_yet_loaded() {
    let agent = SlowAgent::new(Some(4), None);
    let started = Instant::now();
    wait_for_agent_ready(
        &agent,
        &ContextId::from("tab"),
        Duration::from_millis(200),
        Duration::from_secs(10),
    )
    .await
    .unwrap();
    assert_eq!(agent.pings.load(Ordering::SeqCst), 4);
    assert_eq!(started.elapsed(), Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn silent_agent_is_unresponsive_after_timeout() {
    let agent = SlowAgent::new(None, None);
    let err = wait_for_agent_ready(
        &agent,
        &ContextId::from("tab"),
        Duration::from_millis(200),
        Duration::from_secs(2),
    )
    .await
    .unwrap_err();
    assert_eq!(err, PageError::AgentUnresponsive { timeout_ms: 2000 });
}

#[tokio::test(start_paused = true)]
async fn fatal_ping_error_ends_the_wait_early() {
    let agent = SlowAgent {
        fatal: true,
        ..SlowAgent::new(None, None)
    };
    let err = wait_for_agent_ready(
        &agent,
        &ContextId::from("tab"),
        Duration::from_millis(200),
        Duration::from_secs(2),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PageError::Unavailable(_)));
    assert_eq!(agent.pings.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_content_is_soft_and_takes_exactly_the_timeout() {
    let agent = SlowAgent::new(Some(1), None);
    let started = Instant::now();
    let wait = wait_for_content_present(
        &agent,
        &ContextId::from("tab"),
        "listing",
        Duration::from_millis(500),
        Duration::from_millis(3000),
    )
    .await;
    assert_eq!(started.elapsed(), Duration::from_millis(3000));
    assert_eq!(wait, ContentWait::not_found(3000));
    assert!(wait.timed_out);
}

#[tokio::test(start_paused = true)]
async fn content_found_reports_count() {
    let agent = SlowAgent::new(Some(1), Some(2));
    let wait = wait_for_content_present(
        &agent,
        &ContextId::from("tab"),
        "listing",
        Duration::from_millis(500),
        Duration::from_secs(3),
    )
    .await;
    assert!(wait.found);
    assert_eq!(wait.count, 12);
    assert_eq!(wait.waited_ms, 500);
}

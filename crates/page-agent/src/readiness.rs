//! Bounded polling primitives shared by every readiness check.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, warn};

use marketscout_core_types::ContextId;

use crate::errors::PageError;
use crate::model::{ContentWait, LifecycleState};
use crate::ports::PageAgent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    TimedOut { waited: Duration },
    Failed(E),
}

/// Runs `probe` every `interval` until it yields a value, fails, or `timeout`
/// elapses. A probe that hangs is cut off at the deadline, and one final
/// probe always runs at the deadline itself.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let deadline = started + timeout;
    loop {
        match timeout_at(deadline, probe()).await {
            Ok(Ok(Some(value))) => return Ok(value),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => return Err(PollError::Failed(err)),
            Err(_) => {
                return Err(PollError::TimedOut {
                    waited: started.elapsed(),
                })
            }
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(PollError::TimedOut {
                waited: now - started,
            });
        }
        sleep_until((now + interval).min(deadline)).await;
    }
}

/// Pings the page agent until it answers `alive`. Retryable channel errors
/// keep the poll going; anything else ends it early.
pub async fn wait_for_agent_ready(
    agent: &dyn PageAgent,
    ctx: &ContextId,
    interval: Duration,
    timeout: Duration,
) -> Result<(), PageError> {
    let mut attempt = 0u32;
    let outcome = poll_until(interval, timeout, || {
        attempt += 1;
        let current = attempt;
        async move {
            match agent.ping(ctx).await {
                Ok(reply) if reply.alive => Ok(Some(())),
                Ok(_) => Ok(None),
                Err(err) if err.is_retryable() => {
                    debug!(context = %ctx, attempt = current, error = %err, "page agent not ready yet");
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        }
    })
    .await;

    match outcome {
        Ok(()) => {
            debug!(context = %ctx, attempts = attempt, "page agent ready");
            Ok(())
        }
        Err(PollError::Failed(err)) => Err(err),
        Err(PollError::TimedOut { waited }) => {
            warn!(context = %ctx, attempts = attempt, waited_ms = waited.as_millis() as u64, "page agent unresponsive");
            Err(PageError::AgentUnresponsive {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

/// Lifecycle subscription for one context.
///
/// A watch created with [`LifecycleWatch::before_navigation`] ignores the
/// state it was armed with, so a page that was already `Loaded` before an
/// in-place navigation is not mistaken for the new page.
pub struct LifecycleWatch {
    ctx: ContextId,
    rx: watch::Receiver<LifecycleState>,
    accept_current: bool,
}

impl LifecycleWatch {
    /// For a context that was just opened: its current state counts.
    pub fn for_new_context(ctx: ContextId, rx: watch::Receiver<LifecycleState>) -> Self {
        Self {
            ctx,
            rx,
            accept_current: true,
        }
    }

    /// Arm before triggering navigation on an existing context.
    pub fn before_navigation(ctx: ContextId, mut rx: watch::Receiver<LifecycleState>) -> Self {
        rx.borrow_and_update();
        Self {
            ctx,
            rx,
            accept_current: false,
        }
    }

    pub fn context(&self) -> &ContextId {
        &self.ctx
    }
}

/// Resolves once the context reports `Loaded`, then waits `settle` so
/// post-load scripts can run.
pub async fn wait_for_navigation_complete(
    watch: &mut LifecycleWatch,
    settle: Duration,
    timeout: Duration,
) -> Result<(), PageError> {
    let deadline = Instant::now() + timeout;
    loop {
        // A transition published before this call still counts.
        if watch.rx.has_changed().unwrap_or(false) {
            watch.accept_current = true;
        }
        let state = *watch.rx.borrow_and_update();
        if state == LifecycleState::Closed {
            return Err(PageError::ContextClosed(watch.ctx.to_string()));
        }
        if watch.accept_current && state.is_loaded() {
            break;
        }
        match timeout_at(deadline, watch.rx.changed()).await {
            Ok(Ok(())) => watch.accept_current = true,
            Ok(Err(_)) => return Err(PageError::ContextClosed(watch.ctx.to_string())),
            Err(_) => {
                warn!(context = %watch.ctx, ?state, "navigation did not complete in time");
                return Err(PageError::NavigationTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }
    debug!(context = %watch.ctx, settle_ms = settle.as_millis() as u64, "navigation complete; settling");
    tokio::time::sleep(settle).await;
    Ok(())
}

/// Soft wait for site content. Never fails: errors from the predicate count
/// as "not present yet" and expiry yields [`ContentWait::not_found`].
pub async fn wait_for_content_present(
    agent: &dyn PageAgent,
    ctx: &ContextId,
    predicate: &str,
    interval: Duration,
    timeout: Duration,
) -> ContentWait {
    let started = Instant::now();
    let outcome = poll_until::<u32, PageError, _, _>(interval, timeout, || async move {
        match agent.check_content_present(ctx, predicate).await {
            Ok(probe) if probe.present => Ok(Some(probe.count)),
            Ok(_) => Ok(None),
            Err(err) => {
                debug!(context = %ctx, predicate, error = %err, "content check failed; retrying");
                Ok(None)
            }
        }
    })
    .await;

    match outcome {
        Ok(count) => ContentWait::found(count, started.elapsed().as_millis() as u64),
        Err(PollError::TimedOut { waited }) => {
            warn!(context = %ctx, predicate, waited_ms = waited.as_millis() as u64, "content not found; continuing");
            ContentWait::not_found(waited.as_millis() as u64)
        }
        Err(PollError::Failed(_)) => ContentWait::not_found(started.elapsed().as_millis() as u64),
    }
}

use std::sync::Arc;

use tracing::{debug, warn};

use marketscout_core_types::ContextId;

use crate::errors::PageError;
use crate::model::LifecycleState;
use crate::ports::ContextProvider;

/// Exclusive ownership of one execution context.
///
/// [`ContextLease::release`] closes the context. A lease dropped without
/// being released (an early return, a panic, or a cancelled future) closes it
/// from a spawned task instead, so the provider sees exactly one `close` per
/// `open` either way.
pub struct ContextLease {
    provider: Arc<dyn ContextProvider>,
    id: ContextId,
    state: LifecycleState,
    released: bool,
}

impl ContextLease {
    /// Opens a new context for `target` and brings it to the foreground.
    pub async fn acquire(
        provider: Arc<dyn ContextProvider>,
        target: &str,
    ) -> Result<Self, PageError> {
        let id = provider.open(target).await?;
        let lease = Self {
            provider,
            id,
            state: LifecycleState::Opening,
            released: false,
        };
        // Close before returning so the caller cannot open the next context
        // while this one is still alive.
        if let Err(err) = lease.provider.activate(&lease.id).await {
            warn!(context = %lease.id, url = target, error = %err, "context activation failed");
            // Close failures are logged by `release`.
            let _ = lease.release().await;
            return Err(err);
        }
        debug!(context = %lease.id, url = target, "context acquired");
        Ok(lease)
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn provider(&self) -> &Arc<dyn ContextProvider> {
        &self.provider
    }

    /// Records a forward lifecycle transition. Backward moves are ignored.
    pub fn advance(&mut self, next: LifecycleState) {
        if next > self.state && self.state != LifecycleState::Closed {
            self.state = next;
        } else {
            debug!(context = %self.id, from = ?self.state, to = ?next, "ignored lifecycle regression");
        }
    }

    pub async fn release(mut self) -> Result<(), PageError> {
        self.released = true;
        self.state = LifecycleState::Closed;
        let result = self.provider.close(&self.id).await;
        if let Err(err) = &result {
            warn!(context = %self.id, error = %err, "context close failed");
        } else {
            debug!(context = %self.id, "context released");
        }
        result
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let provider = Arc::clone(&self.provider);
        let id = self.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(context = %id, "context lease dropped without release; closing in background");
                handle.spawn(async move {
                    if let Err(err) = provider.close(&id).await {
                        warn!(context = %id, error = %err, "background context close failed");
                    }
                });
            }
            Err(_) => warn!(context = %id, "context lease dropped outside a runtime; context leaked"),
        }
    }
}

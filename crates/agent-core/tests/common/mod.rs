#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{AgentError, SearchBackend, SearchHit, ToolProgress};
use async_trait::async_trait;
use page_agent::{
    AgentPing, ContentProbe, ContextId, ContextProvider, LifecycleState, PageAgent, PageError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::watch;

/// How a target page behaves once its context is opened.
#[derive(Clone, Debug, PartialEq)]
pub enum PageBehavior {
    Healthy,
    /// Agent keeps answering "not yet loaded".
    NeverReady,
    /// Lifecycle never reaches `Loaded`.
    NeverLoads,
    /// `extract_detail` throws.
    ExtractFails,
    /// `activate` fails right after `open`.
    ActivateFails,
}

/// In-memory browser implementing both page ports.
///
/// The foreground context is `fg`. Every `open` creates `ctx-N`.
pub struct FakeBrowser {
    pub behaviors: Mutex<HashMap<String, PageBehavior>>,
    pub listings: Mutex<Vec<Value>>,
    pub content_present: Mutex<bool>,
    pub current_error: Mutex<Option<PageError>>,
    pub opened: AtomicU32,
    pub closed: AtomicU32,
    pub navigations: AtomicU32,
    pub extractions: AtomicU32,
    pub pings: AtomicU32,
    pub events: Mutex<Vec<String>>,
    /// Context ids the page agent was addressed with, in call order.
    pub agent_contexts: Mutex<Vec<String>>,
    contexts: Mutex<HashMap<String, (String, watch::Sender<LifecycleState>)>>,
    next_id: AtomicU32,
}

impl FakeBrowser {
    pub fn new() -> Arc<Self> {
        let browser = Self {
            behaviors: Mutex::new(HashMap::new()),
            listings: Mutex::new(Vec::new()),
            content_present: Mutex::new(true),
            current_error: Mutex::new(None),
            opened: AtomicU32::new(0),
            closed: AtomicU32::new(0),
            navigations: AtomicU32::new(0),
            extractions: AtomicU32::new(0),
            pings: AtomicU32::new(0),
            events: Mutex::new(Vec::new()),
            agent_contexts: Mutex::new(Vec::new()),
            contexts: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
        };
        let (tx, _rx) = watch::channel(LifecycleState::Loaded);
        browser
            .contexts
            .lock()
            .insert("fg".to_string(), ("https://shop.test/".to_string(), tx));
        Arc::new(browser)
    }

    pub fn with_behavior(self: Arc<Self>, target: &str, behavior: PageBehavior) -> Arc<Self> {
        self.behaviors.lock().insert(target.to_string(), behavior);
        self
    }

    pub fn with_listings(self: Arc<Self>, items: Vec<Value>) -> Arc<Self> {
        *self.listings.lock() = items;
        self
    }

    pub fn without_content(self: Arc<Self>) -> Arc<Self> {
        *self.content_present.lock() = false;
        self
    }

    pub fn side_effects(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
            + self.navigations.load(Ordering::SeqCst)
            + self.extractions.load(Ordering::SeqCst)
            + self.pings.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn behavior_of(&self, ctx: &ContextId) -> PageBehavior {
        let target = self
            .contexts
            .lock()
            .get(ctx.as_str())
            .map(|(target, _)| target.clone())
            .unwrap_or_default();
        self.behaviors
            .lock()
            .get(&target)
            .cloned()
            .unwrap_or(PageBehavior::Healthy)
    }

    fn target_of(&self, ctx: &ContextId) -> String {
        self.contexts
            .lock()
            .get(ctx.as_str())
            .map(|(target, _)| target.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageAgent for FakeBrowser {
    async fn ping(&self, ctx: &ContextId) -> Result<AgentPing, PageError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.agent_contexts.lock().push(ctx.to_string());
        match self.behavior_of(ctx) {
            PageBehavior::NeverReady => Err(PageError::NotYetLoaded),
            _ => Ok(AgentPing { alive: true }),
        }
    }

    async fn check_content_present(
        &self,
        _ctx: &ContextId,
        _predicate: &str,
    ) -> Result<ContentProbe, PageError> {
        let present = *self.content_present.lock();
        let count = self.listings.lock().len() as u32;
        Ok(ContentProbe { present, count })
    }

    async fn extract_listing(&self, ctx: &ContextId) -> Result<Vec<Value>, PageError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        self.agent_contexts.lock().push(ctx.to_string());
        Ok(self.listings.lock().clone())
    }

    async fn extract_detail(&self, ctx: &ContextId) -> Result<Value, PageError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        let target = self.target_of(ctx);
        self.events.lock().push(format!("extract:{target}"));
        match self.behavior_of(ctx) {
            PageBehavior::ExtractFails => Err(PageError::extraction("selector missing")),
            _ => Ok(json!({ "url": target, "title": format!("Item at {target}") })),
        }
    }

    async fn navigate_search(&self, ctx: &ContextId, _keyword: &str) -> Result<(), PageError> {
        self.navigations.fetch_add(1, Ordering::SeqCst);
        self.agent_contexts.lock().push(ctx.to_string());
        let guard = self.contexts.lock();
        let (_, tx) = guard
            .get(ctx.as_str())
            .ok_or_else(|| PageError::ContextClosed(ctx.to_string()))?;
        tx.send_replace(LifecycleState::Opening);
        tx.send_replace(LifecycleState::Loaded);
        Ok(())
    }

    async fn navigate_to(&self, ctx: &ContextId, target: &str) -> Result<(), PageError> {
        self.navigate_search(ctx, target).await
    }
}

#[async_trait]
impl ContextProvider for FakeBrowser {
    async fn current(&self) -> Result<ContextId, PageError> {
        match self.current_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(ContextId::from("fg")),
        }
    }

    async fn open(&self, target: &str) -> Result<ContextId, PageError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.events.lock().push(format!("open:{target}"));
        let id = format!("ctx-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let never_loads = self.behaviors.lock().get(target) == Some(&PageBehavior::NeverLoads);
        let initial = if never_loads {
            LifecycleState::Opening
        } else {
            LifecycleState::Loaded
        };
        let (tx, _rx) = watch::channel(initial);
        self.contexts
            .lock()
            .insert(id.clone(), (target.to_string(), tx));
        Ok(ContextId::from(id.as_str()))
    }

    async fn activate(&self, ctx: &ContextId) -> Result<(), PageError> {
        match self.behavior_of(ctx) {
            PageBehavior::ActivateFails => Err(PageError::channel("window could not be focused")),
            _ => Ok(()),
        }
    }

    async fn close(&self, ctx: &ContextId) -> Result<(), PageError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        let target = self.target_of(ctx);
        self.events.lock().push(format!("close:{target}"));
        if let Some((_, tx)) = self.contexts.lock().get(ctx.as_str()) {
            tx.send_replace(LifecycleState::Closed);
        }
        Ok(())
    }

    fn lifecycle(&self, ctx: &ContextId) -> Result<watch::Receiver<LifecycleState>, PageError> {
        self.contexts
            .lock()
            .get(ctx.as_str())
            .map(|(_, tx)| tx.subscribe())
            .ok_or_else(|| PageError::ContextClosed(ctx.to_string()))
    }
}

/// Records every progress callback, and mirrors it into the browser's
/// event log when one is attached.
#[derive(Default)]
pub struct RecordingProgress {
    pub calls: Mutex<Vec<(usize, usize, String)>>,
    pub browser: Option<Arc<FakeBrowser>>,
}

impl ToolProgress for RecordingProgress {
    fn on_progress(&self, current: usize, total: usize, target: &str) {
        self.calls.lock().push((current, total, target.to_string()));
        if let Some(browser) = &self.browser {
            browser.events.lock().push(format!("progress:{target}"));
        }
    }
}

/// Search backend with per-query delays and failures.
#[derive(Default)]
pub struct FakeSearch {
    pub delays: HashMap<String, Duration>,
    pub failing: Vec<String>,
    pub calls: AtomicU32,
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.iter().any(|q| q == query) {
            return Err(AgentError::upstream(format!("HTTP 500 for {query}")));
        }
        Ok(vec![SearchHit {
            title: format!("About {query}"),
            link: format!("https://web.test/{}", query.replace(' ', "-")),
            snippet: format!("Snippet for {query}"),
        }])
    }
}

//! Maps a tool call to one concrete async operation.

use std::sync::Arc;

use async_trait::async_trait;
use page_agent::{
    wait_for_agent_ready, wait_for_content_present, wait_for_navigation_complete, ContextId,
    ContextProvider, LifecycleWatch, PageAgent, PageError,
};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::errors::AgentError;
use crate::external_search::{fan_out, render_report, split_queries, SearchBackend};
use crate::model::{ErrorKind, ToolCall, ToolKind, ToolResult};
use crate::pipeline::ScrapePipeline;
use crate::metrics;

/// Receives per-item progress from long-running tools.
pub trait ToolProgress: Send + Sync {
    /// Called before item `current` (zero-based) of `total` starts.
    fn on_progress(&self, current: usize, total: usize, target: &str);
}

pub struct NoProgress;

impl ToolProgress for NoProgress {
    fn on_progress(&self, _current: usize, _total: usize, _target: &str) {}
}

/// Anything that can run a [`ToolCall`].
///
/// Tool failures come back as `Ok(ToolResult::Err { .. })`. `Err` is kept for
/// failures the loop cannot recover from, such as losing the foreground
/// context.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        call: &ToolCall,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, AgentError>;
}

/// Arguments after validation, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
enum ValidatedCall {
    Search { keyword: String },
    ListExtract { max_items: usize },
    DeepExtractBatch { targets: Vec<String> },
    ExternalSearch { queries: Vec<String> },
}

pub struct ToolDispatcher {
    agent: Arc<dyn PageAgent>,
    provider: Arc<dyn ContextProvider>,
    search: Option<Arc<dyn SearchBackend>>,
    pipeline: ScrapePipeline,
    config: EngineConfig,
}

impl ToolDispatcher {
    pub fn new(
        agent: Arc<dyn PageAgent>,
        provider: Arc<dyn ContextProvider>,
        config: EngineConfig,
    ) -> Self {
        let pipeline = ScrapePipeline::new(
            Arc::clone(&agent),
            Arc::clone(&provider),
            config.readiness.clone(),
        );
        Self {
            agent,
            provider,
            search: None,
            pipeline,
            config,
        }
    }

    pub fn with_search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `call` with page tools pinned to `ctx` instead of the provider's
    /// current foreground context.
    pub async fn execute_with_context(
        &self,
        call: &ToolCall,
        ctx: &ContextId,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, AgentError> {
        self.execute_on(call, Some(ctx), progress).await
    }

    async fn execute_on(
        &self,
        call: &ToolCall,
        ctx: Option<&ContextId>,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, AgentError> {
        let (kind, validated) = match self.resolve(call) {
            Ok(resolved) => resolved,
            Err(result) => return Ok(result),
        };
        let result = self.run(kind, validated, ctx, progress).await;
        self.finish(kind, result)
    }

    fn resolve(&self, call: &ToolCall) -> Result<(ToolKind, ValidatedCall), ToolResult> {
        let Some(kind) = call.kind() else {
            warn!(tool = %call.name, "unknown tool requested");
            return Err(ToolResult::err(
                ErrorKind::UnknownTool,
                format!(
                    "unknown tool '{}'; available tools: {}",
                    call.name,
                    ToolKind::ALL.map(ToolKind::name).join(", ")
                ),
            ));
        };
        let validated = self
            .validate(kind, call)
            .map_err(|detail| ToolResult::err(ErrorKind::InvalidArguments, detail))?;
        Ok((kind, validated))
    }

    fn validate(&self, kind: ToolKind, call: &ToolCall) -> Result<ValidatedCall, String> {
        match kind {
            ToolKind::Search => call
                .str_arg("keyword")
                .map(|keyword| ValidatedCall::Search {
                    keyword: keyword.to_string(),
                })
                .ok_or_else(|| "search requires a non-empty 'keyword'".to_string()),
            ToolKind::ListExtract => {
                let cap = self.config.max_listing_items;
                let max_items = match call.args.get("max_items") {
                    None | Some(Value::Null) => cap,
                    Some(value) => match value.as_u64() {
                        Some(n) if n > 0 => (n as usize).min(cap),
                        _ => return Err("'max_items' must be a positive integer".to_string()),
                    },
                };
                Ok(ValidatedCall::ListExtract { max_items })
            }
            ToolKind::DeepExtractBatch => {
                let raw = call.args.get("urls").or_else(|| call.args.get("targets"));
                let targets: Vec<String> = match raw {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|item| item.as_str().map(|s| s.trim().to_string()))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| "'urls' must contain only strings".to_string())?,
                    Some(Value::String(single)) => vec![single.trim().to_string()],
                    _ => Vec::new(),
                };
                if targets.is_empty() || targets.iter().any(String::is_empty) {
                    return Err("deep_extract_batch requires a non-empty list of 'urls'".to_string());
                }
                if targets.len() > self.config.max_batch_targets {
                    return Err(format!(
                        "deep_extract_batch accepts at most {} urls per call, got {}",
                        self.config.max_batch_targets,
                        targets.len()
                    ));
                }
                Ok(ValidatedCall::DeepExtractBatch { targets })
            }
            ToolKind::ExternalSearch => {
                let queries = split_queries(&call.args, self.config.max_external_queries);
                if queries.is_empty() {
                    return Err("external_search requires a non-empty 'query'".to_string());
                }
                Ok(ValidatedCall::ExternalSearch { queries })
            }
        }
    }

    async fn run(
        &self,
        kind: ToolKind,
        validated: ValidatedCall,
        ctx: Option<&ContextId>,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, PageError> {
        debug!(tool = %kind, "dispatching tool");
        match validated {
            ValidatedCall::Search { keyword } => {
                let ctx = self.foreground(ctx).await?;
                self.search(&ctx, &keyword).await
            }
            ValidatedCall::ListExtract { max_items } => {
                let ctx = self.foreground(ctx).await?;
                self.list_extract(&ctx, max_items).await
            }
            ValidatedCall::DeepExtractBatch { targets } => {
                let batch = self.pipeline.run(&targets, progress).await;
                Ok(ToolResult::ok(batch.render(), batch.to_value()))
            }
            ValidatedCall::ExternalSearch { queries } => Ok(self.external_search(&queries).await),
        }
    }

    async fn foreground(&self, ctx: Option<&ContextId>) -> Result<ContextId, PageError> {
        match ctx {
            Some(ctx) => Ok(ctx.clone()),
            None => self.provider.current().await,
        }
    }

    /// Turns page failures into tool failures, except foreground context loss.
    fn finish(
        &self,
        kind: ToolKind,
        result: Result<ToolResult, PageError>,
    ) -> Result<ToolResult, AgentError> {
        let result = match result {
            Ok(result) => result,
            Err(PageError::ContextClosed(ctx)) => {
                warn!(tool = %kind, context = %ctx, "foreground context lost");
                return Err(AgentError::ContextLost(ctx));
            }
            Err(err) => ToolResult::err(ErrorKind::for_page_error(&err), err.to_string()),
        };
        metrics::record_tool_result(kind.name(), result.is_success_shaped());
        info!(
            tool = %kind,
            ok = result.is_success_shaped(),
            error = ?result.error_kind(),
            "tool finished"
        );
        Ok(result)
    }

    async fn search(&self, ctx: &ContextId, keyword: &str) -> Result<ToolResult, PageError> {
        let readiness = &self.config.readiness;
        let mut watch = LifecycleWatch::before_navigation(ctx.clone(), self.provider.lifecycle(ctx)?);
        self.agent.navigate_search(ctx, keyword).await?;
        wait_for_navigation_complete(&mut watch, readiness.settle(), readiness.navigation_timeout())
            .await?;
        wait_for_agent_ready(
            self.agent.as_ref(),
            ctx,
            readiness.agent_poll(),
            readiness.agent_timeout(),
        )
        .await?;
        let content = wait_for_content_present(
            self.agent.as_ref(),
            ctx,
            &self.config.listing_predicate,
            readiness.content_poll(),
            readiness.content_timeout(),
        )
        .await;

        let report = if content.found {
            format!(
                "Search for '{keyword}' finished. Results page is ready with {} listings detected.",
                content.count
            )
        } else {
            format!(
                "Search for '{keyword}' finished, but no listings were detected within {}ms. \
The page may still be rendering; list_extract can be tried anyway.",
                content.waited_ms
            )
        };
        let mut payload = json!({
            "keyword": keyword,
            "ready": content.found,
            "listingCount": content.count,
            "waitedMs": content.waited_ms,
        });
        if !content.found {
            payload["warning"] = json!(ErrorKind::ContentNotFoundSoft);
        }
        Ok(ToolResult::ok(report, payload))
    }

    async fn list_extract(&self, ctx: &ContextId, max_items: usize) -> Result<ToolResult, PageError> {
        let readiness = &self.config.readiness;
        wait_for_agent_ready(
            self.agent.as_ref(),
            ctx,
            readiness.agent_poll(),
            readiness.agent_timeout(),
        )
        .await?;
        let content = wait_for_content_present(
            self.agent.as_ref(),
            ctx,
            &self.config.listing_predicate,
            readiness.content_poll(),
            readiness.content_timeout(),
        )
        .await;
        if !content.found {
            warn!(context = %ctx, "extracting listings without confirmed content");
        }

        let mut items = self.agent.extract_listing(ctx).await?;
        if items.is_empty() {
            return Ok(ToolResult::err(
                ErrorKind::EmptyResult,
                "no listings found on the current page",
            ));
        }
        let found = items.len();
        items.truncate(max_items);
        let body = serde_json::to_string_pretty(&items).unwrap_or_default();
        let report = format!("Extracted {} of {found} listings:\n{body}", items.len());
        Ok(ToolResult::ok(
            report,
            json!({
                "count": items.len(),
                "found": found,
                "truncated": found > items.len(),
                "items": items,
            }),
        ))
    }

    async fn external_search(&self, queries: &[String]) -> ToolResult {
        let Some(backend) = &self.search else {
            return ToolResult::err(ErrorKind::Upstream, "external search is not configured");
        };
        let outcomes = fan_out(backend.as_ref(), queries).await;
        let report = render_report(&outcomes);
        if outcomes.iter().all(|outcome| !outcome.success()) {
            return ToolResult::err(ErrorKind::Upstream, report);
        }
        let successful = outcomes.iter().filter(|outcome| outcome.success()).count();
        ToolResult::ok(
            report,
            json!({
                "count": outcomes.len(),
                "successful": successful,
                "queries": outcomes,
            }),
        )
    }
}

#[async_trait]
impl ToolExecutor for ToolDispatcher {
    /// Page tools run against the provider's current foreground context.
    async fn execute(
        &self,
        call: &ToolCall,
        progress: &dyn ToolProgress,
    ) -> Result<ToolResult, AgentError> {
        self.execute_on(call, None, progress).await
    }
}

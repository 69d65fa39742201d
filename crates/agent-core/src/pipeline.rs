//! Sequential per-target deep extraction.
//!
//! Targets are processed strictly one after another: the browsing surface
//! has a single usable foreground context, so two targets never hold a
//! context at the same time.

use std::sync::Arc;

use page_agent::{
    wait_for_agent_ready, wait_for_navigation_complete, ContextLease, ContextProvider,
    LifecycleState, LifecycleWatch, PageAgent, PageError, ReadinessPolicy,
};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::dispatcher::ToolProgress;
use crate::model::ErrorKind;

/// One element of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeJob {
    pub index: usize,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    pub index: usize,
    pub target: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

/// One report per submitted target, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub reports: Vec<TargetReport>,
    pub count: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchReport {
    fn from_reports(reports: Vec<TargetReport>) -> Self {
        let successful = reports.iter().filter(|r| r.success).count();
        Self {
            count: reports.len(),
            failed: reports.len() - successful,
            successful,
            reports,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Text report handed back to the model.
    pub fn render(&self) -> String {
        let mut out = format!(
            "=== DEEP EXTRACTION: {} of {} targets succeeded ===\n",
            self.successful, self.count
        );
        for report in &self.reports {
            out.push_str(&format!(
                "\n[{}/{}] {}\n",
                report.index + 1,
                self.count,
                report.target
            ));
            match (&report.data, report.error) {
                (Some(data), _) if report.success => {
                    let body = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
                    out.push_str(&body);
                    out.push('\n');
                }
                (_, error) => {
                    let kind = error.unwrap_or(ErrorKind::PerTargetFailure);
                    let detail = report.detail.as_deref().unwrap_or("no detail");
                    out.push_str(&format!("FAILED [{kind}]: {detail}\n"));
                }
            }
        }
        out
    }
}

pub struct ScrapePipeline {
    agent: Arc<dyn PageAgent>,
    provider: Arc<dyn ContextProvider>,
    readiness: ReadinessPolicy,
}

impl ScrapePipeline {
    pub fn new(
        agent: Arc<dyn PageAgent>,
        provider: Arc<dyn ContextProvider>,
        readiness: ReadinessPolicy,
    ) -> Self {
        Self {
            agent,
            provider,
            readiness,
        }
    }

    /// Never short-circuits: every target gets a report.
    pub async fn run(&self, targets: &[String], progress: &dyn ToolProgress) -> BatchReport {
        let total = targets.len();
        let mut reports = Vec::with_capacity(total);
        for (index, target) in targets.iter().enumerate() {
            progress.on_progress(index, total, target);
            let job = ScrapeJob {
                index,
                target: target.clone(),
            };
            reports.push(self.scrape_one(&job).await);
        }
        let batch = BatchReport::from_reports(reports);
        info!(
            count = batch.count,
            successful = batch.successful,
            failed = batch.failed,
            "deep extraction batch finished"
        );
        batch
    }

    async fn scrape_one(&self, job: &ScrapeJob) -> TargetReport {
        let started = Instant::now();
        let outcome = match validate_target(&job.target) {
            Ok(()) => self.scrape_in_context(job).await,
            Err(detail) => Err((ErrorKind::InvalidArguments, detail)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(data) => {
                debug!(url = %job.target, index = job.index, elapsed_ms, "target extracted");
                TargetReport {
                    index: job.index,
                    target: job.target.clone(),
                    success: true,
                    data: Some(data),
                    error: None,
                    detail: None,
                    elapsed_ms,
                }
            }
            Err((kind, detail)) => {
                warn!(url = %job.target, index = job.index, error = %kind, detail = %detail, "target failed");
                TargetReport {
                    index: job.index,
                    target: job.target.clone(),
                    success: false,
                    data: None,
                    error: Some(kind),
                    detail: Some(detail),
                    elapsed_ms,
                }
            }
        }
    }

    async fn scrape_in_context(&self, job: &ScrapeJob) -> Result<Value, (ErrorKind, String)> {
        let page_failure = |err: PageError| (ErrorKind::for_page_error(&err), err.to_string());

        let mut lease = ContextLease::acquire(Arc::clone(&self.provider), &job.target)
            .await
            .map_err(page_failure)?;
        let result = self.drive(&mut lease).await;
        // Release failures are logged by the lease and do not change the outcome.
        let _ = lease.release().await;
        result.map_err(page_failure)
    }

    async fn drive(&self, lease: &mut ContextLease) -> Result<Value, PageError> {
        let ctx = lease.id().clone();
        let rx = self.provider.lifecycle(&ctx)?;
        let mut watch = LifecycleWatch::for_new_context(ctx.clone(), rx);
        wait_for_navigation_complete(
            &mut watch,
            self.readiness.settle(),
            self.readiness.navigation_timeout(),
        )
        .await?;
        lease.advance(LifecycleState::Loaded);

        wait_for_agent_ready(
            self.agent.as_ref(),
            &ctx,
            self.readiness.agent_poll(),
            self.readiness.target_agent_timeout(),
        )
        .await?;
        lease.advance(LifecycleState::AgentReady);

        lease.advance(LifecycleState::Busy);
        self.agent.extract_detail(&ctx).await
    }
}

fn validate_target(target: &str) -> Result<(), String> {
    let url = Url::parse(target.trim()).map_err(|err| format!("invalid target url '{target}': {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported url scheme '{other}' for '{target}'")),
    }
}

use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

use agent_core::metrics::{self as engine_metrics, EngineMetricsSnapshot};

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();
static TOOL_EXECUTIONS: OnceCell<IntCounterVec> = OnceCell::new();
static ENGINE_EVENTS: OnceCell<IntCounterVec> = OnceCell::new();
static REQUESTS: OnceCell<IntCounterVec> = OnceCell::new();

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();

        register_counter(
            registry,
            &TOOL_EXECUTIONS,
            "marketscout_tool_executions_total",
            "Tool executions grouped by result",
            &["result"],
        );
        register_counter(
            registry,
            &ENGINE_EVENTS,
            "marketscout_engine_events_total",
            "Loop-level engine events (skipped duplicates, guardrail substitutions, loop exits)",
            &["event"],
        );
        register_counter(
            registry,
            &REQUESTS,
            "marketscout_requests_total",
            "Orchestrated user requests grouped by outcome",
            &["outcome"],
        );
    });
}

fn register_counter(
    registry: &Registry,
    slot: &OnceCell<IntCounterVec>,
    name: &str,
    help: &str,
    labels: &[&str],
) {
    let counter = match IntCounterVec::new(Opts::new(name, help), labels) {
        Ok(counter) => counter,
        Err(err) => {
            error!(?err, metric = name, "failed to create metric");
            return;
        }
    };
    if let Err(err) = registry.register(Box::new(counter.clone())) {
        error!(?err, metric = name, "failed to register metric");
    }
    let _ = slot.set(counter);
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

pub fn record_request(outcome: &str) {
    register_metrics();
    if let Some(counter) = REQUESTS.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Brings the exported counters up to the engine's process-wide totals.
pub fn sync_engine_counters() {
    register_metrics();
    let snapshot = engine_metrics::snapshot();
    if let Some(counter) = TOOL_EXECUTIONS.get() {
        advance(counter, "succeeded", snapshot.tool_succeeded);
        advance(counter, "failed", snapshot.tool_failed);
    }
    if let Some(counter) = ENGINE_EVENTS.get() {
        for (event, total) in engine_events(&snapshot) {
            advance(counter, event, total);
        }
    }
}

fn engine_events(snapshot: &EngineMetricsSnapshot) -> [(&'static str, u64); 5] {
    [
        ("duplicate_skipped", snapshot.duplicates_skipped),
        ("guardrail_substitution", snapshot.guardrail_substitutions),
        ("loop_completed", snapshot.loops_completed),
        ("max_turns_exit", snapshot.max_turns_exits),
        ("loop_cancelled", snapshot.loops_cancelled),
    ]
}

fn advance(counter: &IntCounterVec, label: &str, total: u64) {
    let metric = counter.with_label_values(&[label]);
    let current = metric.get();
    if total > current {
        metric.inc_by(total - current);
    }
}

/// Prometheus text exposition of every registered metric.
pub fn render() -> Result<String, prometheus::Error> {
    sync_engine_counters();
    let encoder = TextEncoder::new();
    let metric_families = global_registry().gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}

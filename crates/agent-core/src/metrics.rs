use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct Counters {
    tool_succeeded: AtomicU64,
    tool_failed: AtomicU64,
    duplicates_skipped: AtomicU64,
    guardrail_substitutions: AtomicU64,
    loops_completed: AtomicU64,
    max_turns_exits: AtomicU64,
    loops_cancelled: AtomicU64,
}

static COUNTERS: Lazy<Counters> = Lazy::new(Counters::default);

fn increment(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tool_result(_tool: &str, success: bool) {
    if success {
        increment(&COUNTERS.tool_succeeded);
    } else {
        increment(&COUNTERS.tool_failed);
    }
}

pub fn record_duplicate_skipped(_tool: &str) {
    increment(&COUNTERS.duplicates_skipped);
}

pub fn record_guardrail_substitution(_tool: &str) {
    increment(&COUNTERS.guardrail_substitutions);
}

pub fn record_loop_completed() {
    increment(&COUNTERS.loops_completed);
}

pub fn record_max_turns_exit() {
    increment(&COUNTERS.max_turns_exits);
}

pub fn record_loop_cancelled() {
    increment(&COUNTERS.loops_cancelled);
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EngineMetricsSnapshot {
    pub tool_succeeded: u64,
    pub tool_failed: u64,
    pub duplicates_skipped: u64,
    pub guardrail_substitutions: u64,
    pub loops_completed: u64,
    pub max_turns_exits: u64,
    pub loops_cancelled: u64,
}

pub fn snapshot() -> EngineMetricsSnapshot {
    EngineMetricsSnapshot {
        tool_succeeded: COUNTERS.tool_succeeded.load(Ordering::Relaxed),
        tool_failed: COUNTERS.tool_failed.load(Ordering::Relaxed),
        duplicates_skipped: COUNTERS.duplicates_skipped.load(Ordering::Relaxed),
        guardrail_substitutions: COUNTERS.guardrail_substitutions.load(Ordering::Relaxed),
        loops_completed: COUNTERS.loops_completed.load(Ordering::Relaxed),
        max_turns_exits: COUNTERS.max_turns_exits.load(Ordering::Relaxed),
        loops_cancelled: COUNTERS.loops_cancelled.load(Ordering::Relaxed),
    }
}

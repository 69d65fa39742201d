mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use agent_core::{
    ConversationToolLoop, EngineConfig, ErrorKind, GuardrailLimits, InvocationGuardrail,
    LoopStatus, NoProgress, NoopObserver, ScriptedLlm, ToolCall, ToolDispatcher, ToolExecutor,
    ToolKind, ToolResult,
};
use common::FakeBrowser;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn guarded(browser: &Arc<FakeBrowser>, limits: GuardrailLimits) -> InvocationGuardrail {
    let dispatcher = ToolDispatcher::new(browser.clone(), browser.clone(), EngineConfig::default());
    InvocationGuardrail::new(Arc::new(dispatcher), limits)
}

fn search(keyword: &str) -> ToolCall {
    ToolCall::new("search", json!({ "keyword": keyword }))
}

#[tokio::test(start_paused = true)]
async fn third_search_is_substituted_without_navigation() {
    let browser = FakeBrowser::new().with_listings(vec![json!({"title": "A"})]);
    let guard = guarded(&browser, GuardrailLimits::default());

    for keyword in ["kettle", "electric kettle"] {
        let result = guard.execute(&search(keyword), &NoProgress).await.unwrap();
        assert!(matches!(result, ToolResult::Ok { .. }));
    }
    let third = guard.execute(&search("steel kettle"), &NoProgress).await.unwrap();

    assert_eq!(third.error_kind(), Some(ErrorKind::LimitReached));
    assert!(third.is_success_shaped());
    let carried = third.data().expect("last good search data");
    assert_eq!(carried.payload["keyword"], json!("electric kettle"));
    assert_eq!(browser.navigations.load(Ordering::SeqCst), 2);
    assert_eq!(guard.usage().count(ToolKind::Search), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_calls_count_toward_the_ceiling() {
    let browser = FakeBrowser::new();
    let guard = guarded(&browser, GuardrailLimits::default());

    for _ in 0..2 {
        let result = guard
            .execute(&ToolCall::new("list_extract", json!({})), &NoProgress)
            .await
            .unwrap();
        assert_eq!(result.error_kind(), Some(ErrorKind::EmptyResult));
    }
    let third = guard
        .execute(&ToolCall::new("list_extract", json!({})), &NoProgress)
        .await
        .unwrap();
    match third {
        ToolResult::LimitReached { last_good, .. } => assert!(last_good.is_none()),
        other => panic!("expected LimitReached, got {other:?}"),
    }
    assert_eq!(browser.extractions.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn guardrail_layers_under_the_loop() {
    let browser = FakeBrowser::new().with_listings(vec![json!({"title": "A"})]);
    let guard = guarded(&browser, GuardrailLimits::default());
    let llm = ScriptedLlm::new([
        "```json\n{\"tool\": \"search\", \"args\": {\"keyword\": \"a\"}}\n```",
        "```json\n{\"tool\": \"search\", \"args\": {\"keyword\": \"b\"}}\n```",
        "```json\n{\"tool\": \"search\", \"args\": {\"keyword\": \"c\"}}\n```",
        "Based on what I found, pick A.",
    ]);
    let outcome = ConversationToolLoop::new(15)
        .run(&llm, &guard, "find", &NoopObserver, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, LoopStatus::Completed);
    assert_eq!(outcome.tools_executed, 3);
    assert_eq!(browser.navigations.load(Ordering::SeqCst), 2);
    let limit_prompt = &llm.prompts()[3];
    assert!(limit_prompt.contains("Tool limit reached"));
    assert!(limit_prompt.contains("Search for 'b' finished"));
}

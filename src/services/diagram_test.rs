use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use super::*;
use crate::llm::test_helpers::{spawn_stub_endpoint, MockCompletion};
use crate::llm::types::{LlmError, Role};
use crate::render::test_helpers::{echo_svg, MockEngine};
use crate::services::prompts::DEFAULT_SYSTEM_PROMPT;

const SEQ: &str = "sequenceDiagram\nA->>B: hi";

fn settings(retries: u32) -> Settings {
    Settings {
        endpoint: "https://llm.test/openai/deployments/gpt/chat/completions".into(),
        api_key: "k".into(),
        retries,
        backoff: Duration::ZERO,
        ..Settings::default()
    }
}

fn parse_error() -> RenderError {
    RenderError::Parse { line: 1, message: "parse error".into() }
}

fn prompt(text: &str) -> RenderRequest {
    RenderRequest::Prompt { system: "sys".into(), prompt: text.into() }
}

// =============================================================================
// RenderRequest::from_inputs
// =============================================================================

#[test]
fn from_inputs_literal_wins_when_non_blank() {
    assert_eq!(RenderRequest::from_inputs(SEQ, "sys", "p"), RenderRequest::Literal(SEQ.into()));
}

#[test]
fn from_inputs_blank_literal_means_prompt_mode() {
    assert_eq!(
        RenderRequest::from_inputs("  \n", "sys", "draw"),
        RenderRequest::Prompt { system: "sys".into(), prompt: "draw".into() }
    );
}

// =============================================================================
// RETRY BOUNDS
// =============================================================================

#[tokio::test]
async fn literal_success_on_first_attempt() {
    let llm = MockCompletion::always("unused");
    let engine = MockEngine::succeeding();
    let mut slot = RenderSlot::named("graphDiv");

    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(3)).await;

    assert_eq!(result.attempts, 1);
    assert_eq!(result.source_text, SEQ);
    assert_eq!(result.artifact().map(Artifact::markup), Some(echo_svg("graphDiv").as_str()));
    assert!(result.error().is_none());
    assert_eq!(slot.contents(), result.artifact());
    assert_eq!(engine.targets(), ["graphDiv"]);
}

#[tokio::test]
async fn fails_n_minus_one_times_then_succeeds_in_exactly_n_attempts() {
    for n in 1..=5u32 {
        let mut script: Vec<Result<String, RenderError>> = (1..n).map(|_| Err(parse_error())).collect();
        script.push(Ok("<svg>done</svg>".into()));
        let engine = MockEngine::new(script);
        let llm = MockCompletion::always("unused");
        let mut slot = RenderSlot::new();

        let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(n)).await;

        assert_eq!(result.attempts, n, "n = {n}");
        assert_eq!(engine.call_count(), n as usize);
        assert!(result.artifact().is_some());
    }
}

#[tokio::test]
async fn always_failing_exhausts_after_exactly_n_attempts() {
    for n in 1..=4u32 {
        let engine = MockEngine::new(Vec::new());
        let llm = MockCompletion::always("unused");
        let mut slot = RenderSlot::new();

        let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(n)).await;

        assert_eq!(result.attempts, n);
        assert_eq!(engine.call_count(), n as usize);
        assert!(result.artifact().is_none());
        assert!(!result.error().unwrap().to_string().is_empty());
        assert_eq!(result.source_text, "");
        assert!(slot.contents().is_none());
    }
}

#[tokio::test]
async fn zero_retries_still_makes_one_attempt() {
    let engine = MockEngine::new(vec![Err(parse_error())]);
    let llm = MockCompletion::always("unused");
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(0)).await;

    assert_eq!(result.attempts, 1);
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn parse_errors_twice_then_svg_ok() {
    let engine = MockEngine::new(vec![Err(parse_error()), Err(parse_error()), Ok("<svg>ok</svg>".into())]);
    let llm = MockCompletion::always(SEQ);
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &prompt("draw"), &settings(3)).await;

    assert_eq!(result.artifact().map(Artifact::markup), Some("<svg>ok</svg>"));
    assert!(result.error().is_none());
    assert_eq!(result.attempts, 3);
    assert_eq!(result.source_text, SEQ);
    // Prompt mode regenerates text every attempt.
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn single_retry_always_failing_reports_engine_error() {
    let engine = MockEngine::new(vec![Err(RenderError::Engine("boom".into()))]);
    let llm = MockCompletion::always("unused");
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(1)).await;

    assert_eq!(result.attempts, 1);
    assert!(result.artifact().is_none());
    assert_eq!(result.error(), Some(&RenderError::Engine("boom".into())));
}

#[tokio::test]
async fn failure_reports_last_error() {
    let engine = MockEngine::new(vec![Err(parse_error()), Err(RenderError::Engine("second".into()))]);
    let llm = MockCompletion::always("unused");
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(2)).await;

    assert_eq!(result.error(), Some(&RenderError::Engine("second".into())));
}

// =============================================================================
// TEXT ACQUISITION
// =============================================================================

#[tokio::test]
async fn literal_mode_never_calls_completion() {
    let engine = MockEngine::new(Vec::new());
    let llm = MockCompletion::always(SEQ);
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(3)).await;

    assert_eq!(result.attempts, 3);
    assert_eq!(llm.call_count(), 0);
    assert_eq!(engine.texts(), [SEQ, SEQ, SEQ]);
}

#[tokio::test]
async fn prompt_mode_without_endpoint_or_key_renders_empty_text_every_attempt() {
    for (endpoint, api_key) in [("", "k"), ("https://llm.test", ""), ("  ", "  ")] {
        let engine = MockEngine::succeeding();
        let llm = MockCompletion::always(SEQ);
        let mut slot = RenderSlot::new();
        let settings = Settings { endpoint: endpoint.into(), api_key: api_key.into(), ..settings(3) };

        let result = render_diagram(&llm, &engine, &mut slot, &prompt("draw"), &settings).await;

        assert_eq!(llm.call_count(), 0);
        assert_eq!(engine.texts(), ["", "", ""]);
        assert_eq!(result.error(), Some(&RenderError::Empty));
    }
}

#[tokio::test]
async fn blank_prompt_skips_completion() {
    let engine = MockEngine::succeeding();
    let llm = MockCompletion::always(SEQ);
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &prompt("   "), &settings(2)).await;

    assert_eq!(llm.call_count(), 0);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.error(), Some(&RenderError::Empty));
}

#[tokio::test]
async fn prompt_mode_sends_system_then_user() {
    let engine = MockEngine::succeeding();
    let llm = MockCompletion::always(SEQ);
    let mut slot = RenderSlot::new();

    render_diagram(&llm, &engine, &mut slot, &prompt("draw a login flow"), &settings(3)).await;

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], [Message::system("sys"), Message::user("draw a login flow")]);
    assert_eq!(calls[0][0].role, Role::System);
}

#[tokio::test]
async fn blank_system_falls_back_to_default_instruction() {
    let engine = MockEngine::succeeding();
    let llm = MockCompletion::always(SEQ);
    let mut slot = RenderSlot::new();
    let request = RenderRequest::Prompt { system: " ".into(), prompt: "draw".into() };

    render_diagram(&llm, &engine, &mut slot, &request, &settings(3)).await;

    assert_eq!(llm.calls()[0][0], Message::system(DEFAULT_SYSTEM_PROMPT));
}

#[tokio::test]
async fn completion_error_becomes_empty_text_and_consumes_an_attempt() {
    let engine = MockEngine::succeeding();
    let llm = MockCompletion::new(vec![Err(LlmError::ApiRequest("connection refused".into())), Ok(SEQ.into())]);
    let mut slot = RenderSlot::new();

    let result = render_diagram(&llm, &engine, &mut slot, &prompt("draw"), &settings(3)).await;

    assert_eq!(result.attempts, 2);
    assert_eq!(engine.texts(), ["", SEQ]);
    assert_eq!(result.source_text, SEQ);
}

#[tokio::test]
async fn http_500_yields_empty_text_then_render_failure() {
    let stub = spawn_stub_endpoint(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "down"})).await;
    let client = crate::llm::CompletionClient::new(crate::config::LlmTimeouts { request_secs: 5, connect_secs: 5 }).unwrap();
    let engine = MockEngine::succeeding();
    let mut slot = RenderSlot::new();
    let settings = Settings { endpoint: stub.url.clone(), ..settings(1) };

    let result = render_diagram(&client, &engine, &mut slot, &prompt("draw"), &settings).await;

    assert_eq!(stub.requests().len(), 1);
    assert_eq!(result.attempts, 1);
    assert_eq!(engine.texts(), [""]);
    assert_eq!(result.error(), Some(&RenderError::Empty));
}

// =============================================================================
// SLOT + TIMING
// =============================================================================

#[tokio::test]
async fn failure_clears_previous_artifact() {
    let mut slot = RenderSlot::new();
    let llm = MockCompletion::always("unused");

    let ok = MockEngine::succeeding();
    render_diagram(&llm, &ok, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(1)).await;
    assert!(slot.contents().is_some());

    let failing = MockEngine::new(Vec::new());
    render_diagram(&llm, &failing, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings(1)).await;
    assert!(slot.contents().is_none());
}

#[tokio::test]
async fn independent_slots_render_under_their_own_ids() {
    let llm = MockCompletion::always("unused");
    let engine = MockEngine::succeeding();
    let mut a = RenderSlot::named("a");
    let mut b = RenderSlot::named("b");
    let request = RenderRequest::Literal(SEQ.into());
    let one = settings(1);

    let (ra, rb) = tokio::join!(
        render_diagram(&llm, &engine, &mut a, &request, &one),
        render_diagram(&llm, &engine, &mut b, &request, &one),
    );

    assert_eq!(ra.artifact().map(Artifact::target_id), Some("a"));
    assert_eq!(rb.artifact().map(Artifact::target_id), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn waits_fixed_backoff_between_attempts_only() {
    let engine = MockEngine::new(Vec::new());
    let llm = MockCompletion::always("unused");
    let mut slot = RenderSlot::new();
    let settings = Settings { backoff: Duration::from_millis(100), ..settings(3) };

    let started = tokio::time::Instant::now();
    let result = render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings).await;

    assert_eq!(result.attempts, 3);
    // Two gaps between three attempts; no wait after the last failure.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn success_returns_without_waiting() {
    let engine = MockEngine::succeeding();
    let llm = MockCompletion::always("unused");
    let mut slot = RenderSlot::new();
    let settings = Settings { backoff: Duration::from_secs(10), ..settings(3) };

    let started = tokio::time::Instant::now();
    render_diagram(&llm, &engine, &mut slot, &RenderRequest::Literal(SEQ.into()), &settings).await;

    assert_eq!(started.elapsed(), Duration::ZERO);
}

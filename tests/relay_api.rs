//! Integration tests for the relay HTTP API
//!
//! The router is exercised in-process with `oneshot`; the model is a scripted
//! provider so no network access is needed.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;

use smeduverse_ai::agent::ChatAgent;
use smeduverse_ai::llm::{
    FinishReason, GenerationSettings, LlmEventStream, LlmProvider, Message, StreamEvent,
    ToolDefinition,
};
use smeduverse_ai::tools::ToolRegistry;
use smeduverse_ai::transport::{router, AppState};

enum Script {
    Steps(Mutex<VecDeque<Vec<StreamEvent>>>),
    AlwaysCallTools,
    Reject(&'static str),
}

struct ScriptedProvider(Script);

impl ScriptedProvider {
    fn steps(steps: Vec<Vec<StreamEvent>>) -> Self {
        Self(Script::Steps(Mutex::new(steps.into())))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn chat_stream(
        &self,
        _messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _settings: &GenerationSettings,
    ) -> anyhow::Result<LlmEventStream> {
        let events = match &self.0 {
            Script::Steps(steps) => match steps.lock().unwrap().pop_front() {
                Some(events) => events,
                None => anyhow::bail!("no scripted step left"),
            },
            Script::AlwaysCallTools => tool_call_step("call_loop"),
            Script::Reject(message) => anyhow::bail!("{}", message),
        };
        let events: Vec<anyhow::Result<StreamEvent>> = events.into_iter().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn tool_call_step(id: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::ToolCallStart {
            id: id.into(),
            name: "getSchoolStats".into(),
        },
        StreamEvent::ToolCallDelta {
            id: id.into(),
            arguments_delta: "{}".into(),
        },
        StreamEvent::ToolCallComplete { id: id.into() },
        StreamEvent::Finish(FinishReason::ToolCalls),
    ]
}

fn text_step(text: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::TextDelta(text.into()),
        StreamEvent::Finish(FinishReason::Stop),
    ]
}

fn state_with(provider: ScriptedProvider, max_steps: usize, static_dir: PathBuf) -> AppState {
    let agent = ChatAgent::new(Arc::new(provider), Arc::new(ToolRegistry::with_defaults()))
        .with_max_steps(max_steps);
    AppState {
        agent: Arc::new(agent),
        static_dir,
    }
}

fn state(provider: ScriptedProvider) -> AppState {
    state_with(provider, 20, PathBuf::from("./dist"))
}

fn chat_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://sekolah.example.com")
        .body(body.into())
        .unwrap()
}

fn user_turn(text: &str) -> String {
    json!({
        "id": "chat_1",
        "messages": [
            {"id": "u1", "role": "user", "parts": [{"type": "text", "text": text}]}
        ],
        "trigger": "submit-message"
    })
    .to_string()
}

async fn body_text(body: Body) -> String {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// JSON payloads of every `data:` frame except `[DONE]`
fn chunks(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|payload| *payload != "[DONE]")
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

fn chunk_types(chunks: &[Value]) -> Vec<&str> {
    chunks.iter().map(|c| c["type"].as_str().unwrap()).collect()
}

#[tokio::test]
async fn test_health_check() {
    let response = router(state(ScriptedProvider::steps(vec![])))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_missing_messages_is_bad_request() {
    for body in [
        r#"{}"#.to_string(),
        r#"{"messages": "halo"}"#.to_string(),
        r#"{"messages": null}"#.to_string(),
        "not json".to_string(),
    ] {
        let response = router(state(ScriptedProvider::steps(vec![])))
            .oneshot(chat_request(body.clone()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let error: Value = serde_json::from_str(&body_text(response.into_body()).await).unwrap();
        assert_eq!(error, json!({"error": "Messages array is required"}));
    }
}

#[tokio::test]
async fn test_upstream_rejection_before_stream_is_500() {
    let provider = ScriptedProvider(Script::Reject("Invalid API Key"));
    let response = router(state(provider))
        .oneshot(chat_request(user_turn("Halo")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = serde_json::from_str(&body_text(response.into_body()).await).unwrap();
    assert_eq!(error, json!({"error": "Invalid API Key"}));
}

#[tokio::test]
async fn test_text_reply_streams_ui_chunks() {
    let provider = ScriptedProvider::steps(vec![text_step("Halo, Bapak/Ibu Guru!")]);
    let response = router(state(provider))
        .oneshot(chat_request(user_turn("Halo")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-vercel-ai-ui-message-stream"], "v1");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body = body_text(response.into_body()).await;
    assert!(body.ends_with("data: [DONE]\n\n"));

    let chunks = chunks(&body);
    assert_eq!(
        chunk_types(&chunks),
        vec![
            "start",
            "start-step",
            "text-start",
            "text-delta",
            "text-end",
            "finish-step",
            "finish"
        ]
    );
    assert_eq!(chunks[3]["delta"], "Halo, Bapak/Ibu Guru!");
    assert_eq!(chunks[6]["finishReason"], "stop");
}

#[tokio::test]
async fn test_tool_round_trip_is_streamed() {
    let provider = ScriptedProvider::steps(vec![
        tool_call_step("call_1"),
        text_step("Statistik sekolah sudah saya ambil."),
    ]);
    let response = router(state(provider))
        .oneshot(chat_request(user_turn("Berapa jumlah siswa?")))
        .await
        .unwrap();

    let chunks = chunks(&body_text(response.into_body()).await);
    let output = chunks
        .iter()
        .find(|c| c["type"] == "tool-output-available")
        .unwrap();
    assert_eq!(output["toolCallId"], "call_1");
    assert_eq!(output["output"], "test");

    let types = chunk_types(&chunks);
    assert_eq!(types.iter().filter(|t| **t == "start-step").count(), 2);
    assert_eq!(types.last(), Some(&"finish"));
}

#[tokio::test]
async fn test_step_limit_ends_stream() {
    let provider = ScriptedProvider(Script::AlwaysCallTools);
    let state = state_with(provider, 3, PathBuf::from("./dist"));
    let response = router(state)
        .oneshot(chat_request(user_turn("Halo")))
        .await
        .unwrap();

    let body = body_text(response.into_body()).await;
    assert!(body.ends_with("data: [DONE]\n\n"));
    let chunks = chunks(&body);
    let types = chunk_types(&chunks);
    assert_eq!(types.iter().filter(|t| **t == "start-step").count(), 3);
    assert_eq!(chunks.last().unwrap()["finishReason"], "tool-calls");
}

#[tokio::test]
async fn test_failure_after_first_step_is_in_band() {
    // one tool step, then the scripted provider has nothing left to open
    let provider = ScriptedProvider::steps(vec![tool_call_step("call_1")]);
    let response = router(state(provider))
        .oneshot(chat_request(user_turn("Halo")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response.into_body()).await;
    assert!(body.ends_with("data: [DONE]\n\n"));
    let chunks = chunks(&body);
    let last = chunks.last().unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["errorText"], "no scripted step left");
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/chat")
        .header(header::ORIGIN, "https://sekolah.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = router(state(ScriptedProvider::steps(vec![])))
        .oneshot(request)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_widget_bundle_is_served_under_cdn() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("smeduverse-ai.js"), "window.SmeduverseAI = {};").unwrap();

    let state = state_with(ScriptedProvider::steps(vec![]), 20, dir.path().to_path_buf());
    let response = router(state.clone())
        .oneshot(
            Request::get("/cdn/smeduverse-ai.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response.into_body()).await,
        "window.SmeduverseAI = {};"
    );

    let missing = router(state)
        .oneshot(Request::get("/cdn/nope.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

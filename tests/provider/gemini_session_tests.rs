// Gemini session tests - generateContent over HTTP against an in-process stub
//
// Request shape, key placement, reply interpretation, history bookkeeping and
// error classification.

#[path = "../support/mod.rs"]
mod support;

use axum::http::StatusCode;
use mcp_chat_core::domain::{ChatRole, FunctionResponse, Part, TurnContent};
use mcp_chat_core::infrastructure::model::{GeminiSession, ModelError, ModelSession};
use mcp_chat_core::orchestrator::{TurnError, TurnErrorKind};
use mcp_chat_core::schema::{FunctionDeclaration, ObjectSchema};
use serde_json::json;
use support::mock_gemini::{MockGemini, text_reply};

fn session(gemini: &MockGemini) -> GeminiSession {
    GeminiSession::new(&gemini.endpoint, Some("test-key".into()), "gemini-test")
}

#[tokio::test]
async fn posts_to_model_endpoint_with_query_key() {
    let gemini = MockGemini::start().await;
    gemini.reply(text_reply("hello"));
    let mut session = session(&gemini);

    let reply = session.send("hi".into()).await.expect("reply");
    assert_eq!(reply.text.as_deref(), Some("hello"));

    let request = &gemini.requests()[0];
    assert_eq!(request.call, "gemini-test:generateContent");
    assert_eq!(request.key.as_deref(), Some("test-key"));
}

#[tokio::test]
async fn request_body_carries_history_tools_and_settings() {
    let gemini = MockGemini::start().await;
    gemini.reply(text_reply("first")).reply(text_reply("second"));
    let mut session = session(&gemini)
        .with_temperature(0.2)
        .with_system_prompt(Some("Answer briefly.".into()));
    session.set_available_functions(vec![FunctionDeclaration {
        name: "docs_search".into(),
        description: "Search the docs".into(),
        parameters: ObjectSchema::empty(),
    }]);

    session.send("one".into()).await.expect("first");
    session.send("two".into()).await.expect("second");

    let body = &gemini.requests()[1].body;
    let roles: Vec<&str> = body["contents"]
        .as_array()
        .expect("contents")
        .iter()
        .filter_map(|c| c["role"].as_str())
        .collect();
    assert_eq!(roles, vec!["user", "model", "user"]);
    assert_eq!(body["contents"][2]["parts"][0]["text"], "two");
    assert_eq!(
        body["tools"][0]["functionDeclarations"][0]["name"],
        "docs_search"
    );
    assert_eq!(body["safetySettings"].as_array().map(Vec::len), Some(4));
    assert!(
        body["safetySettings"]
            .as_array()
            .into_iter()
            .flatten()
            .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE")
    );
    let temperature = body["generationConfig"]["temperature"].as_f64().expect("temperature");
    assert!((temperature - 0.2).abs() < 1e-6);
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        "Answer briefly."
    );
}

#[tokio::test]
async fn function_calls_and_signatures_round_trip_through_history() {
    let gemini = MockGemini::start().await;
    gemini
        .reply(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {
                            "functionCall": {"name": "docs_search", "args": {"q": "rust"}},
                            "thoughtSignature": "sig-1"
                        }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .reply(text_reply("Found it."));
    let mut session = session(&gemini);

    let reply = session.send("search rust".into()).await.expect("reply");
    assert!(reply.text.is_none(), "thought text is not visible");
    assert_eq!(reply.function_calls.len(), 1);
    assert_eq!(reply.function_calls[0].name, "docs_search");
    assert_eq!(reply.function_calls[0].args["q"], "rust");

    let response = TurnContent::Parts(vec![Part::FunctionResponse(FunctionResponse {
        name: "docs_search".into(),
        response: json!({"content": []}),
    })]);
    session.send(response).await.expect("follow-up");

    let body = &gemini.requests()[1].body;
    let model_turn = &body["contents"][1];
    assert_eq!(model_turn["role"], "model");
    assert_eq!(model_turn["parts"][0]["functionCall"]["name"], "docs_search");
    assert_eq!(model_turn["parts"][0]["thoughtSignature"], "sig-1");
    assert_eq!(
        body["contents"][2]["parts"][0]["functionResponse"]["name"],
        "docs_search"
    );
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn blocked_prompt_is_reported() {
    let gemini = MockGemini::start().await;
    gemini.reply(json!({
        "promptFeedback": {"blockReason": "SAFETY", "blockReasonMessage": "unsafe"}
    }));
    let mut session = session(&gemini);

    let reply = session.send("bad".into()).await.expect("reply");
    let block = reply.block.expect("blocked");
    assert_eq!(block.reason, "SAFETY");
    assert_eq!(block.detail.as_deref(), Some("unsafe"));
    // No candidate: nothing recorded.
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn safety_finish_without_content_is_a_block() {
    let gemini = MockGemini::start().await;
    gemini.reply(json!({"candidates": [{"finishReason": "SAFETY"}]}));
    let mut session = session(&gemini);

    let reply = session.send("hmm".into()).await.expect("reply");
    assert_eq!(reply.block.map(|b| b.reason).as_deref(), Some("SAFETY"));
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].role, ChatRole::User);
}

#[tokio::test]
async fn api_errors_keep_status_and_message() {
    let gemini = MockGemini::start().await;
    gemini.reply_with(
        StatusCode::BAD_REQUEST,
        json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}),
    );
    let mut session = session(&gemini);

    let err = session.send("hi".into()).await.expect_err("api error");
    assert!(matches!(err, ModelError::Api { status: 400, .. }));
    assert_eq!(TurnError::classify(&err).kind, TurnErrorKind::InvalidCredential);
    assert!(session.history().is_empty());

    gemini.reply_with(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}),
    );
    let err = session.send("again".into()).await.expect_err("quota");
    assert_eq!(TurnError::classify(&err).kind, TurnErrorKind::QuotaExceeded);
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let gemini = MockGemini::start().await;
    let mut session = GeminiSession::new(&gemini.endpoint, None, "gemini-test");

    let err = session.send("hi".into()).await.expect_err("no key");
    assert!(matches!(err, ModelError::MissingApiKey { .. }));
    assert!(gemini.requests().is_empty());
}

#[tokio::test]
async fn reset_forgets_history() {
    let gemini = MockGemini::start().await;
    gemini.reply(text_reply("hello"));
    let mut session = session(&gemini);
    session.send("hi".into()).await.expect("reply");
    assert_eq!(session.history().len(), 2);

    session.reset();
    assert!(session.history().is_empty());
}

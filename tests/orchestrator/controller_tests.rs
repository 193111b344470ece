// Chat controller tests - the facade over a scripted model and HTTP MCP servers
//
// Server management with rediscovery, transcript building and events.

#[path = "../support/mod.rs"]
mod support;

use mcp_chat_core::config::ServerStore;
use mcp_chat_core::domain::{FunctionCall, MessageRole, Part, ToolCallStatus};
use mcp_chat_core::infrastructure::model::LlmResponse;
use mcp_chat_core::orchestrator::TurnOutcome;
use mcp_chat_core::tooling::HttpTransport;
use mcp_chat_core::{ChatController, ChatEvent, EventKind};
use serde_json::json;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use support::args;
use support::mock_mcp::MockMcpServer;
use support::scripted::ScriptedSession;
use tempfile::tempdir;

fn controller(session: ScriptedSession, store: ServerStore) -> ChatController<ScriptedSession> {
    ChatController::new(
        session,
        store,
        Arc::new(HttpTransport::new(Duration::from_secs(5))),
    )
}

#[tokio::test]
async fn adding_a_server_discovers_its_tools() {
    let server = MockMcpServer::standard().await;
    let mut chat = controller(ScriptedSession::default(), ServerStore::in_memory());
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    chat.events()
        .subscribe(EventKind::ToolDiscoveryUpdated, move |event| {
            if let ChatEvent::ToolDiscoveryUpdated(registry) = event {
                sink.lock().expect("updates").push(registry.len());
            }
        });

    let added = chat.add_server("svc", &server.url).await.expect("added");
    assert!(added.is_default);
    assert_eq!(
        chat.discovered_tools().names(),
        vec!["svc_echo", "svc_fail", "svc_rpc_error"]
    );
    assert_eq!(chat.session().declarations.len(), 3);

    chat.remove_server("svc").await.expect("removed");
    assert!(chat.discovered_tools().is_empty());
    assert!(chat.session().declarations.is_empty());
    assert_eq!(*updates.lock().expect("updates"), vec![3, 0]);
}

#[tokio::test]
async fn server_changes_survive_a_restart() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("servers.toml");
    let server = MockMcpServer::standard().await;

    {
        let store = ServerStore::open(&path).expect("open");
        let mut chat = controller(ScriptedSession::default(), store);
        chat.add_server("svc", &server.url).await.expect("added");
        chat.add_server("backup", &server.url).await.expect("added");
        chat.set_default_server("backup").expect("default");
    }

    let mut chat = controller(ScriptedSession::default(), ServerStore::open(&path).expect("reopen"));
    assert_eq!(chat.list_servers().len(), 2);
    assert_eq!(chat.default_server().map(|s| s.name).as_deref(), Some("backup"));
    assert_eq!(chat.server("svc").map(|s| s.url), Some(server.url.clone()));

    let summary = chat.rediscover_tools().await;
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.tools_mapped, 6);
    assert!(fs::read_to_string(&path).expect("read").contains("backup"));
}

#[tokio::test]
async fn tool_turn_builds_the_transcript() {
    let server = MockMcpServer::standard().await;
    let session = ScriptedSession::new(vec![
        Ok(LlmResponse::calls(vec![FunctionCall::new(
            "svc_echo",
            args(json!({"text": "ping"})),
        )])),
        Ok(LlmResponse::text("The tool said ping.")),
    ]);
    let mut chat = controller(session, ServerStore::in_memory());
    chat.add_server("svc", &server.url).await.expect("added");

    let outcome = chat.send_message("echo ping", &[]).await;
    assert_eq!(outcome, Some(TurnOutcome::Text("The tool said ping.".into())));

    let messages = chat.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[0].content, "echo ping");
    assert_eq!(
        messages[1].content,
        r#"Attempting to call tool: svc_echo with args: {"text":"ping"}"#
    );
    assert_eq!(
        messages[1].tool_call.as_ref().map(|c| c.status),
        Some(ToolCallStatus::Pending)
    );
    assert_eq!(messages[2].role, MessageRole::Tool);
    assert!(messages[2].content.starts_with("Tool svc_echo succeeded. Result: "));
    assert_eq!(
        messages[2]
            .tool_call
            .as_ref()
            .and_then(|c| c.result.as_ref())
            .map(|r| r["structuredContent"].clone()),
        Some(json!({"echoed": "ping"}))
    );
    assert_eq!(messages[3].role, MessageRole::Assistant);
    assert!(!messages[3].is_error);
}

#[tokio::test]
async fn failed_tool_is_marked_in_transcript() {
    let server = MockMcpServer::standard().await;
    let session = ScriptedSession::new(vec![
        Ok(LlmResponse::calls(vec![FunctionCall::new("svc_fail", args(json!({})))])),
        Ok(LlmResponse::text("It failed.")),
    ]);
    let mut chat = controller(session, ServerStore::in_memory());
    chat.add_server("svc", &server.url).await.expect("added");

    chat.send_message("try it", &[]).await;

    let tool_message = chat
        .messages()
        .iter()
        .find(|m| m.role == MessageRole::Tool)
        .expect("tool message");
    assert!(tool_message.content.starts_with("Tool svc_fail failed. Result: "));
    assert_eq!(
        tool_message.tool_call.as_ref().map(|c| c.status),
        Some(ToolCallStatus::Error)
    );
}

#[tokio::test]
async fn attachments_reach_the_model_and_the_transcript() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("note.txt");
    fs::write(&file, "remember me").expect("write");
    let mut chat = controller(
        ScriptedSession::new(vec![Ok(LlmResponse::text("Noted."))]),
        ServerStore::in_memory(),
    );

    chat.send_message("read this", &[file]).await;

    let sent = chat.session().sent[0].parts();
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[1], Part::InlineData(blob) if blob.mime_type == "text/plain"));
    let user = &chat.messages()[0];
    assert_eq!(user.content, "read this");
    assert_eq!(user.parts.as_ref().map(Vec::len), Some(2));
}

#[tokio::test]
async fn message_events_mirror_the_transcript() {
    let mut chat = controller(
        ScriptedSession::new(vec![Ok(LlmResponse::text("hello back"))]),
        ServerStore::in_memory(),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    chat.events().subscribe(EventKind::Message, move |event| {
        if let ChatEvent::Message(message) = event {
            sink.lock().expect("seen").push(message.id.clone());
        }
    });

    chat.send_message("hello", &[]).await;
    let ids: Vec<String> = chat.messages().iter().map(|m| m.id.clone()).collect();
    assert_eq!(*seen.lock().expect("seen"), ids);
}

// HTTP transport tests - streamable-HTTP MCP client against an in-process server
//
// Covers the initialize handshake, session and protocol headers, JSON and SSE
// response bodies, tools/list pagination, tool errors and DELETE on close.

#[path = "../support/mod.rs"]
mod support;

use mcp_chat_core::tooling::{HttpTransport, ToolTransport, TransportError};
use serde_json::json;
use std::time::Duration;
use support::args;
use support::mock_mcp::{MockMcpServer, SESSION_ID, echo_tool, tool};

fn transport() -> HttpTransport {
    HttpTransport::new(Duration::from_secs(5))
}

#[tokio::test]
async fn handshake_sends_initialize_then_initialized() {
    let server = MockMcpServer::standard().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    connection.close().await;

    assert_eq!(
        server.methods(),
        vec!["initialize", "notifications/initialized", "DELETE"]
    );
    let initialize = &server.requests()[0];
    assert_eq!(initialize.params["protocolVersion"], "2025-06-18");
    assert_eq!(
        initialize.accept.as_deref(),
        Some("application/json, text/event-stream")
    );
    assert!(initialize.session.is_none());
}

#[tokio::test]
async fn session_and_protocol_headers_follow_initialize() {
    let server = MockMcpServer::standard().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    connection.list_tools().await;
    connection.close().await;

    for request in server.requests().iter().skip(1) {
        assert_eq!(request.session.as_deref(), Some(SESSION_ID), "{}", request.method);
        assert_eq!(request.protocol.as_deref(), Some("2025-06-18"), "{}", request.method);
    }
}

#[tokio::test]
async fn lists_tools_as_plain_json() {
    let server = MockMcpServer::standard().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    let tools = connection.list_tools().await;
    connection.close().await;

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "fail", "rpc_error"]);
    assert_eq!(tools[0].description.as_deref(), Some("Echoes its input"));
    assert_eq!(tools[0].input_schema["required"], json!(["text"]));
}

#[tokio::test]
async fn follows_pagination_cursor() {
    let server = MockMcpServer::builder()
        .tool(tool("a", "first"))
        .tool(tool("b", "second"))
        .tool(tool("c", "third"))
        .page_size(2)
        .start()
        .await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    let tools = connection.list_tools().await;
    connection.close().await;

    assert_eq!(tools.len(), 3);
    assert_eq!(server.count("tools/list"), 2);
    let second_page = server
        .requests()
        .into_iter()
        .filter(|r| r.method == "tools/list")
        .nth(1)
        .expect("second page");
    assert_eq!(second_page.params["cursor"], "2");
}

#[tokio::test]
async fn reads_event_stream_bodies() {
    let server = MockMcpServer::builder().tool(echo_tool()).sse().start().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");

    let tools = connection.list_tools().await;
    assert_eq!(tools.len(), 1);

    let result = connection
        .call_tool("echo", args(json!({"text": "over sse"})))
        .await
        .expect("call");
    connection.close().await;

    assert!(!result.is_error);
    assert_eq!(result.text_content(), "over sse");
}

#[tokio::test]
async fn tool_results_and_errors() {
    let server = MockMcpServer::standard().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");

    let ok = connection
        .call_tool("echo", args(json!({"text": "hi"})))
        .await
        .expect("echo");
    assert!(!ok.is_error);
    assert_eq!(ok.structured_content, Some(json!({"echoed": "hi"})));

    let failed = connection
        .call_tool("fail", args(json!({})))
        .await
        .expect("fail is a result, not a transport error");
    assert!(failed.is_error);
    assert_eq!(failed.text_content(), "boom");

    let rpc = connection
        .call_tool("rpc_error", args(json!({})))
        .await
        .expect("rpc errors fold into results");
    assert!(rpc.is_error);
    assert_eq!(
        rpc.text_content(),
        "Error calling MCP tool rpc_error: invalid arguments"
    );
    connection.close().await;
}

#[tokio::test]
async fn close_is_idempotent_and_skips_delete_without_session() {
    let server = MockMcpServer::builder().without_session().start().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    connection.close().await;
    connection.close().await;
    assert_eq!(server.count("DELETE"), 0);

    let with_session = MockMcpServer::standard().await;
    let mut connection = transport()
        .connect(&with_session.url)
        .await
        .expect("connect");
    connection.close().await;
    connection.close().await;
    assert_eq!(with_session.count("DELETE"), 1);
}

#[tokio::test]
async fn calls_after_close_are_refused() {
    let server = MockMcpServer::standard().await;
    let mut connection = transport().connect(&server.url).await.expect("connect");
    connection.close().await;

    let err = connection
        .call_tool("echo", args(json!({"text": "late"})))
        .await
        .expect_err("closed");
    assert!(matches!(err, TransportError::Closed { .. }));
    assert!(connection.list_tools().await.is_empty());
}

#[tokio::test]
async fn failed_initialize_is_a_status_error() {
    let server = MockMcpServer::builder().rejecting_initialize().start().await;
    let err = match transport().connect(&server.url).await {
        Ok(_) => panic!("initialize should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, TransportError::Status { status: 503, .. }));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let result = transport()
        .connect(&format!("http://127.0.0.1:{port}/mcp"))
        .await;
    assert!(matches!(result, Err(TransportError::Http { .. })));
}

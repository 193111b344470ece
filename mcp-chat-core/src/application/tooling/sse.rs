//! Minimal `text/event-stream` reader for streamable-HTTP responses.
//!
//! The MCP server closes the stream once the response for a POSTed request
//! has been sent, so the whole body is available before parsing. Only `data:`
//! fields matter here; `event:`, `id:`, `retry:` and comments are ignored.

use serde_json::Value;
use tracing::debug;

/// Data payloads of every event in `body`, multi-line data joined with `\n`.
pub fn event_payloads(body: &str) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut current: Option<String> = None;

    for line in body.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if let Some(data) = current.take() {
                payloads.push(data);
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("data:") else {
            continue;
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match current.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(rest);
            }
            None => current = Some(rest.to_string()),
        }
    }
    if let Some(data) = current {
        payloads.push(data);
    }
    payloads
}

/// JSON-RPC messages carried by the stream. Payloads that are not JSON are
/// skipped; batched arrays are flattened.
pub fn json_messages(body: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    for payload in event_payloads(body) {
        match serde_json::from_str::<Value>(&payload) {
            Ok(Value::Array(batch)) => messages.extend(batch),
            Ok(message) => messages.push(message),
            Err(err) => debug!(%err, "Ignoring non-JSON event payload"),
        }
    }
    messages
}

/// The response addressed to `request_id`, ignoring interleaved server
/// requests and notifications.
pub fn find_response(messages: Vec<Value>, request_id: u64) -> Option<Value> {
    messages.into_iter().find(|message| {
        message.get("method").is_none()
            && message.get("id").and_then(response_id) == Some(request_id)
    })
}

fn response_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

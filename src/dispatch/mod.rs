//! Tool Dispatch Runtime (spec §4.7) — the shared MCP protocol engine run by
//! both transports. Each transport turns its wire format into an
//! [`RpcRequest`] and a response string; this module is the only place that
//! knows about `initialize` / `tools/list` / `tools/call` / cancellation.

pub mod sse;
pub mod stdio;

use crate::tools::{self, AppState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "vibecraft";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

fn ok(id: Value, result: Value) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: Some(result), error: None }
}

fn err(id: Value, code: i64, message: impl Into<String>) -> RpcResponse {
    RpcResponse { jsonrpc: "2.0", id, result: None, error: Some(RpcError { code, message: message.into() }) }
}

/// Tracks the [`CancellationToken`] for every in-flight `tools/call`
/// invocation, keyed by the request's JSON-RPC id, so a
/// `notifications/cancelled` message can reach the right task (spec §4.7,
/// "per-invocation task spawn + cancellation token"). A request id is
/// registered for the lifetime of its call and nowhere else — this is what
/// gives exactly-once invocation its other half: a cancellation that arrives
/// after the call already completed finds nothing to cancel, it never
/// un-does or re-runs a finished invocation.
#[derive(Default)]
pub struct InvocationRegistry {
    inflight: Mutex<HashMap<String, CancellationToken>>,
}

impl InvocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, id: &Value) -> CancellationToken {
        let token = CancellationToken::new();
        self.inflight.lock().unwrap().insert(id_key(id), token.clone());
        token
    }

    fn complete(&self, id: &Value) {
        self.inflight.lock().unwrap().remove(&id_key(id));
    }

    pub fn cancel(&self, id: &Value) {
        if let Some(token) = self.inflight.lock().unwrap().get(&id_key(id)) {
            token.cancel();
        }
    }
}

fn id_key(id: &Value) -> String {
    serde_json::to_string(id).unwrap_or_default()
}

/// Handle one request to completion. Returns `None` for requests with no
/// `id` (JSON-RPC notifications) — those are invoked but never answered.
pub async fn handle_request(state: &AppState, registry: &InvocationRegistry, request: RpcRequest) -> Option<RpcResponse> {
    if request.method == "notifications/cancelled" {
        if let Some(request_id) = request.params.as_ref().and_then(|p| p.get("requestId")) {
            registry.cancel(request_id);
        }
        return None;
    }

    let id = request.id.clone();
    let params = request.params.unwrap_or(Value::Null);

    let outcome: Result<Value, (i64, String)> = match request.method.as_str() {
        "initialize" => Ok(initialize_result()),
        "tools/list" => Ok(tools_list_result()),
        "tools/call" => tools_call(state, registry, id.clone(), params).await,
        "notifications/initialized" | "ping" => Ok(Value::Null),
        other => Err((-32601, format!("method not found: {other}"))),
    };

    let id = id?;
    Some(match outcome {
        Ok(value) => ok(id, value),
        Err((code, message)) => err(id, code, message),
    })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
        "capabilities": { "tools": {} },
    })
}

fn tools_list_result() -> Value {
    let tools = tools::list_tools()
        .into_iter()
        .map(|t| json!({ "name": t.name, "description": t.description, "inputSchema": t.input_schema }))
        .collect::<Vec<_>>();
    json!({ "tools": tools })
}

async fn tools_call(
    state: &AppState,
    registry: &InvocationRegistry,
    id: Option<Value>,
    params: Value,
) -> Result<Value, (i64, String)> {
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or((-32602, "missing 'name'".to_string()))?
        .to_string();
    let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    let cancel = CancellationToken::new();
    if let Some(id) = &id {
        // Notifications (no id) can't be cancelled by id and aren't tracked.
        registry.register(id);
    }
    let result = tools::call_tool(state, &name, arguments, cancel).await;
    if let Some(id) = &id {
        registry.complete(id);
    }

    Ok(match result {
        Ok(value) => json!({
            "content": [{ "type": "text", "text": serde_json::to_string(&value).unwrap_or_default() }],
            "isError": false,
        }),
        Err(e) => json!({
            "content": [{ "type": "text", "text": e.to_string() }],
            "isError": true,
            "errorCategory": e.category(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ClientBridge;
    use crate::catalog::Catalog;
    use crate::config::Config;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState {
            config: Arc::new(Config::default()),
            catalog: Arc::new(Catalog::load().unwrap()),
            bridge: ClientBridge::new(Config::default().bridge),
        }
    }

    #[tokio::test]
    async fn initialize_returns_protocol_version() {
        let request = RpcRequest { id: Some(json!(1)), method: "initialize".to_string(), params: None };
        let response = handle_request(&state(), &InvocationRegistry::new(), request).await.unwrap();
        assert_eq!(response.result.unwrap()["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_list_includes_describe() {
        let request = RpcRequest { id: Some(json!(1)), method: "tools/list".to_string(), params: None };
        let response = handle_request(&state(), &InvocationRegistry::new(), request).await.unwrap();
        let names: Vec<String> = response.result.unwrap()["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert!(names.contains(&"describe".to_string()));
    }

    #[tokio::test]
    async fn unknown_method_is_rejected_with_method_not_found_code() {
        let request = RpcRequest { id: Some(json!(1)), method: "bogus/method".to_string(), params: None };
        let response = handle_request(&state(), &InvocationRegistry::new(), request).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn notification_with_no_id_gets_no_response() {
        let request = RpcRequest { id: None, method: "notifications/initialized".to_string(), params: None };
        assert!(handle_request(&state(), &InvocationRegistry::new(), request).await.is_none());
    }

    #[tokio::test]
    async fn tools_call_without_bridge_still_returns_a_structured_error_result() {
        let request = RpcRequest {
            id: Some(json!(1)),
            method: "tools/call".to_string(),
            params: Some(json!({ "name": "pattern_lookup", "arguments": { "name": "does-not-exist" } })),
        };
        let response = handle_request(&state(), &InvocationRegistry::new(), request).await.unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["errorCategory"], "catalog_miss");
    }
}

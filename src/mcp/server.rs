//! MCP server loop: JSON-RPC over stdio.
//!
//! Stdout carries only JSON-RPC frames; all logging goes through `tracing`
//! to stderr. The registry is owned by the server and never mutated after
//! startup, so concurrent tool calls need no synchronization.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::registry::{RegistryError, ToolRegistry};

use super::protocol::*;

pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Serve requests line by line from stdin until EOF.
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let mut stdout = tokio::io::stdout();

        info!(tools = self.registry.len(), "MCP server ready");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(frame = %preview(&line), "incoming");

            let Some(response) = self.handle(&line).await else {
                continue; // notification, nothing to send back
            };
            let out = serde_json::to_string(&response)?;
            debug!(frame = %preview(&out), "outgoing");

            stdout.write_all(out.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }

        info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one JSON-RPC message. Returns `None` for notifications.
    pub async fn handle(&self, msg: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(msg) {
            Ok(r) => r,
            Err(e) => return Some(JsonRpcResponse::error(None, PARSE_ERROR, e.to_string())),
        };

        if req.id.is_none() && req.method.starts_with("notifications/") {
            return None;
        }
        let id = req.id.clone();

        let response = match req.method.as_str() {
            "initialize" => self.initialize(id),
            "notifications/initialized" => JsonRpcResponse::success(id, Value::Null),
            "tools/list" => to_response(
                id,
                ToolsListResult {
                    tools: self.registry.list(),
                },
            ),
            "tools/call" => self.call_tool(id, req.params).await,
            _ => {
                warn!(method = %req.method, "unknown method");
                JsonRpcResponse::error(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown method: {}", req.method),
                )
            }
        };
        Some(response)
    }

    fn initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        to_response(
            id,
            InitializeResult {
                protocol_version: PROTOCOL_VERSION.into(),
                capabilities: ServerCapabilities {
                    tools: ToolsCapability {
                        list_changed: false,
                    },
                },
                server_info: ServerInfo {
                    name: "whatsapp-mcp".into(),
                    version: env!("CARGO_PKG_VERSION").into(),
                },
            },
        )
    }

    async fn call_tool(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()),
        };

        debug!(tool = %params.name, "tools/call");
        match self.registry.invoke(&params.name, params.arguments).await {
            Ok(envelope) => to_response(id, ToolCallResult::from_envelope(&envelope)),
            Err(e @ RegistryError::NotFound(_)) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string())
            }
        }
    }
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(v) => JsonRpcResponse::success(id, v),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}")),
    }
}

fn preview(line: &str) -> &str {
    let end = line
        .char_indices()
        .nth(120)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn empty_server() -> McpServer {
        McpServer::new(ToolRegistry::new())
    }

    #[tokio::test]
    async fn initialize_handshake() {
        let server = empty_server();
        let response = server
            .handle(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(value["result"]["serverInfo"]["name"], "whatsapp-mcp");
    }

    #[tokio::test]
    async fn parse_error_yields_jsonrpc_error() {
        let server = empty_server();
        let response = server.handle("not json").await.unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let server = empty_server();
        let response = server
            .handle(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let server = empty_server();
        let response = server
            .handle(r#"{"jsonrpc":"2.0","id":7,"method":"resources/list"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(value["id"], json!(7));
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = empty_server();
        let response = server
            .handle(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
            )
            .await
            .unwrap();
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["error"]["code"], INVALID_PARAMS);
        assert!(value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("unknown tool"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let line = "ü".repeat(200);
        let p = preview(&line);
        assert_eq!(p.chars().count(), 120);
    }
}

//! MCP stdio server implementation

use super::tools::{get_tool_definitions, handle_tool_call, ToolContext};
use super::types::{McpError, McpMessage, McpNotification, McpRequest, McpResponse};
use crate::config::Config;
use crate::error::Result;
use crate::jobs::JobService;
use crate::store::ContentStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP Server implementation
pub struct McpServer {
    config: Config,
    store: ContentStore,
    jobs: JobService,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(config: Config, store: ContentStore, jobs: JobService) -> Self {
        Self {
            config,
            store,
            jobs,
        }
    }

    /// Run the MCP server loop over stdio
    pub async fn run(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run_with(stdin, stdout).await
    }

    /// Serve newline-delimited JSON-RPC until the reader is exhausted
    pub async fn run_with<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server starting on stdio");

        let mut lines = reader.lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(l)) => l,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read line: {}", e);
                    break;
                }
            };

            if let Some(response) = self.handle_line(&line).await {
                let response_str = serde_json::to_string(&response)?;
                debug!("Sending: {}", response_str);
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        info!("MCP server shutting down");
        Ok(())
    }

    /// Handle one input line; `None` when nothing should be written back
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Received: {}", line);

        let message: McpMessage = match serde_json::from_str(line) {
            Ok(m) => m,
            Err(e) => {
                error!("Failed to parse message: {}", e);
                return Some(McpResponse::error(
                    None,
                    McpError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        match message {
            McpMessage::Request(req) => Some(self.handle_request(req).await),
            McpMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            McpMessage::Response(_) => {
                warn!("Unexpected response message received");
                None
            }
        }
    }

    /// Handle an MCP request
    async fn handle_request(&self, request: McpRequest) -> McpResponse {
        let id = request.id.clone();

        if request.jsonrpc != "2.0" {
            return McpResponse::error(
                id,
                McpError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => McpResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => McpResponse::success(id, json!({ "resources": [] })),
            "prompts/list" => McpResponse::success(id, json!({ "prompts": [] })),
            _ => McpResponse::error(id, McpError::method_not_found(&request.method)),
        }
    }

    /// Handle notifications (fire-and-forget)
    async fn handle_notification(&self, notification: McpNotification) {
        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("Client initialized");
            }
            "notifications/cancelled" => {
                info!("Request cancelled");
            }
            _ => {
                debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> McpResponse {
        McpResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {
                        "listChanged": false
                    },
                    "resources": {
                        "subscribe": false,
                        "listChanged": false
                    },
                    "prompts": {
                        "listChanged": false
                    }
                },
                "serverInfo": {
                    "name": "egw-library",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> McpResponse {
        let tools = get_tool_definitions();
        McpResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> McpResponse {
        let params = match params {
            Some(p) => p,
            None => return McpResponse::error(id, McpError::invalid_params("Missing params")),
        };

        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n.to_string(),
            None => return McpResponse::error(id, McpError::invalid_params("Missing tool name")),
        };

        let arguments: HashMap<String, Value> = match params.get("arguments") {
            None | Some(Value::Null) => HashMap::new(),
            Some(v) => match serde_json::from_value(v.clone()) {
                Ok(args) => args,
                Err(e) => {
                    return McpResponse::error(
                        id,
                        McpError::invalid_params(format!("Invalid arguments: {}", e)),
                    )
                }
            },
        };

        debug!("Calling tool: {} with args: {:?}", name, arguments);

        let ctx = ToolContext {
            config: &self.config,
            store: &self.store,
            jobs: &self.jobs,
        };
        let result = handle_tool_call(&name, &arguments, &ctx).await;

        McpResponse::success(
            id,
            json!({
                "content": result.content,
                "isError": result.is_error
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BookRecord;
    use tempfile::TempDir;

    async fn server() -> (McpServer, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        let store = ContentStore::connect(&config).await.unwrap();
        store
            .insert_book(&BookRecord {
                book_id: 5,
                code: "DA".into(),
                lang: "en".into(),
                book_type: "book".into(),
                title: "The Desire of Ages".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let jobs = JobService::in_memory(store.clone(), config.paths.export_dir.clone());
        (McpServer::new(config, store, jobs), tmp)
    }

    #[tokio::test]
    async fn test_initialize_and_tools_list() {
        let (server, _tmp) = server().await;

        let init = server
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .await
            .unwrap();
        let result = init.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "egw-library");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);

        let list = server
            .handle_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, get_tool_definitions().len());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let (server, _tmp) = server().await;

        let parse = server.handle_line("{nope").await.unwrap();
        assert_eq!(parse.error.unwrap().code, -32700);
        assert!(parse.id.is_none());

        let version = server
            .handle_line(r#"{"jsonrpc":"1.0","id":3,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(version.error.unwrap().code, -32600);

        let unknown = server
            .handle_line(r#"{"jsonrpc":"2.0","id":4,"method":"books/burn"}"#)
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, -32601);

        let missing = server
            .handle_line(r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{}}"#)
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, -32602);

        assert!(server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(server.handle_line("   ").await.is_none());
    }

    #[tokio::test]
    async fn test_tool_call_over_stream() {
        let (server, _tmp) = server().await;

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_book","arguments":{"book_id":5}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"read_book","arguments":{"book_id":5}}}"#,
            "\n",
        );
        let mut output = Vec::new();
        server.run_with(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert!(responses[0]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("The Desire of Ages"));
        assert_eq!(responses[1]["result"]["isError"], true);
        assert!(responses[1]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("empty_content"));
    }
}

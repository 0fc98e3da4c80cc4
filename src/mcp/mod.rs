//! MCP (Model Context Protocol) server implementation
//!
//! Exposes library search, browsing and PDF jobs over stdio.

mod server;
mod tools;
mod types;

pub use server::McpServer;
pub use tools::{get_tool_definitions, handle_tool_call, ToolContext};
pub use types::{McpError, McpRequest, McpResponse, ToolResult};

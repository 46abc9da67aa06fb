//! Model Context Protocol (MCP) tool backend for codewright.
//!
//! Connects to configured MCP servers through `rmcp` and exposes their tools
//! through [`RemoteToolBackend`](codewright_core::remote::RemoteToolBackend).
//! The stdio transport is always available; streamable HTTP needs the
//! `http` feature.

mod backend;

pub use backend::McpBackend;

use codewright_core::error::ToolError;
use codewright_core::tool::ToolResult;

/// Separator between server and tool in model-facing names.
pub const NAME_SEPARATOR: &str = "__";

/// Model-facing name of `tool` on `server`.
pub fn qualify(server: &str, tool: &str) -> String {
    format!("{server}{NAME_SEPARATOR}{tool}")
}

/// Split a model-facing name into `(server, tool)`.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAME_SEPARATOR)
        .filter(|(server, tool)| !server.is_empty() && !tool.is_empty())
}

/// Turn a serialized MCP `CallToolResult` into a [`ToolResult`].
///
/// Text parts are joined with newlines. Structured content, or text that
/// parses as JSON, becomes the result data. `isError` results are failures.
pub fn parse_call_result(
    tool_name: &str,
    value: &serde_json::Value,
) -> Result<ToolResult, ToolError> {
    let text = value["content"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter(|p| p["type"] == "text")
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if value["isError"].as_bool().unwrap_or(false) {
        return Err(ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: if text.is_empty() {
                "remote tool reported an error".into()
            } else {
                text
            },
        });
    }

    let data = match value.get("structuredContent") {
        Some(structured) if !structured.is_null() => Some(structured.clone()),
        _ => serde_json::from_str::<serde_json::Value>(&text).ok(),
    };

    Ok(ToolResult {
        success: true,
        output: text,
        data,
    })
}

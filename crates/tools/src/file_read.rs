//! File read tool: read file contents, optionally a window of lines.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};

use crate::workspace::Workspace;

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file. Optionally read only `limit` lines starting at line `offset` (1-based)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_file": {
                    "type": "string",
                    "description": "Path of the file to read, relative to the workspace root"
                },
                "offset": {
                    "type": "integer",
                    "description": "Line number to start reading from (1-based, optional)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of lines to read (optional, defaults to the whole file)"
                }
            },
            "required": ["target_file"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let target = arguments["target_file"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'target_file' argument".into()))?;
        let offset = arguments["offset"].as_u64();
        let limit = arguments["limit"].as_u64();

        let path = self.workspace.resolve(target, self.name())?;

        if !path.is_file() {
            return Ok(ToolResult::failure(format!("File not found: {target}")));
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(ToolResult::failure(format!("Failed to read file: {e}"))),
        };
        let content = String::from_utf8_lossy(&bytes);

        if offset.is_none() && limit.is_none() {
            return Ok(ToolResult::ok(content.into_owned()));
        }

        let start = offset.unwrap_or(1).saturating_sub(1) as usize;
        let lines = content.split_inclusive('\n').skip(start);
        let window: String = match limit {
            Some(n) => lines.take(n as usize).collect(),
            None => lines.collect(),
        };
        Ok(ToolResult::ok(window))
    }
}

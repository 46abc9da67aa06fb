//! File write tool: create or overwrite a file inside the workspace.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};

use crate::workspace::Workspace;

pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates the file and missing parent directories if needed, overwrites it if it exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to write, relative to the workspace root"
                },
                "contents": {
                    "type": "string",
                    "description": "The full content of the file"
                }
            },
            "required": ["file_path", "contents"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let file_path = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;
        let contents = arguments["contents"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'contents' argument".into()))?;

        let path = self.workspace.resolve(file_path, self.name())?;

        if path.is_dir() {
            return Ok(ToolResult::failure(format!(
                "Cannot write to '{file_path}': it is a directory"
            )));
        }

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failure(format!("Failed to create directory: {e}")));
        }

        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                let rel = self.workspace.relative(&path);
                tracing::debug!(file = %rel, bytes = contents.len(), "File written");
                Ok(ToolResult::with_data(
                    format!("Wrote {} bytes to {rel}", contents.len()),
                    serde_json::json!({
                        "file": rel,
                        "bytes_written": contents.len(),
                    }),
                ))
            }
            Err(e) => Ok(ToolResult::failure(format!("Failed to write file: {e}"))),
        }
    }
}

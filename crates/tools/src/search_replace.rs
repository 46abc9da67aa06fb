//! Search-and-replace tool: targeted edits without rewriting the whole file.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};

use crate::workspace::Workspace;

pub struct SearchReplaceTool {
    workspace: Workspace,
}

impl SearchReplaceTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for SearchReplaceTool {
    fn name(&self) -> &str {
        "search_replace"
    }

    fn description(&self) -> &str {
        "Replace text in a file. Replaces the first occurrence of `old_string`, or every occurrence when `replace_all` is true."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path of the file to edit"
                },
                "old_string": {
                    "type": "string",
                    "description": "Exact text to replace"
                },
                "new_string": {
                    "type": "string",
                    "description": "Replacement text"
                },
                "replace_all": {
                    "type": "boolean",
                    "description": "Replace every occurrence (default: only the first)",
                    "default": false
                }
            },
            "required": ["file_path", "old_string", "new_string"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let file_path = arguments["file_path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))?;
        let old_string = arguments["old_string"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'old_string' argument".into()))?;
        let new_string = arguments["new_string"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'new_string' argument".into()))?;
        let replace_all = arguments["replace_all"].as_bool().unwrap_or(false);

        if old_string.is_empty() {
            return Err(ToolError::InvalidArguments(
                "'old_string' must not be empty".into(),
            ));
        }

        let path = self.workspace.resolve(file_path, self.name())?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolResult::failure(format!("File not found: {file_path}")));
            }
            Err(e) => return Ok(ToolResult::failure(format!("Failed to read file: {e}"))),
        };

        let occurrences = content.matches(old_string).count();
        if occurrences == 0 {
            let preview: String = old_string.chars().take(50).collect();
            return Ok(ToolResult::with_data(
                format!("Text '{preview}' not found in {file_path}"),
                serde_json::json!({
                    "status": "not_found",
                    "message": format!("Text '{preview}' not found in file"),
                }),
            ));
        }

        let (updated, replacements) = if replace_all {
            (content.replace(old_string, new_string), occurrences)
        } else {
            (content.replacen(old_string, new_string, 1), 1)
        };

        if let Err(e) = tokio::fs::write(&path, updated).await {
            return Ok(ToolResult::failure(format!("Failed to write file: {e}")));
        }

        let rel = self.workspace.relative(&path);
        Ok(ToolResult::with_data(
            format!("Replaced {replacements} occurrence(s) in {rel}"),
            serde_json::json!({
                "status": "success",
                "file": rel,
                "replacements": replacements,
            }),
        ))
    }
}

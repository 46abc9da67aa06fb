//! Delete file tool. Refuses protected project files.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};

use crate::workspace::Workspace;

/// File names that are never deleted, in addition to configured ones.
pub const PROTECTED_NAMES: &[&str] = &[
    ".git",
    ".env",
    "Cargo.toml",
    "Cargo.lock",
    "package.json",
    "requirements.txt",
];

pub struct DeleteFileTool {
    workspace: Workspace,
    protected: Vec<String>,
}

impl DeleteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            protected: PROTECTED_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add extra protected file names.
    pub fn with_protected(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.protected.extend(names);
        self
    }

    fn is_protected(&self, name: &str) -> bool {
        self.protected.iter().any(|p| p == name)
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &str {
        "delete_file"
    }

    fn description(&self) -> &str {
        "Delete a file in the workspace. Protected project files cannot be deleted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_file": {
                    "type": "string",
                    "description": "Path of the file to delete"
                }
            },
            "required": ["target_file"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let target = arguments["target_file"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'target_file' argument".into()))?;

        let path = self.workspace.resolve(target, self.name())?;

        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && self.is_protected(name)
        {
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: format!("'{name}' is a protected file"),
            });
        }

        if !path.exists() {
            return Ok(ToolResult::with_data(
                format!("File not found: {target}"),
                serde_json::json!({
                    "status": "not_found",
                    "message": format!("File not found: {target}"),
                }),
            ));
        }

        if !path.is_file() {
            return Ok(ToolResult::failure(format!("Not a file: {target}")));
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                let rel = self.workspace.relative(&path);
                tracing::info!(file = %rel, "File deleted");
                Ok(ToolResult::with_data(
                    format!("Deleted {rel}"),
                    serde_json::json!({ "status": "success", "file": rel }),
                ))
            }
            Err(e) => Ok(ToolResult::failure(format!("Failed to delete file: {e}"))),
        }
    }
}

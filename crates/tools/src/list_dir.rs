//! Directory listing tool.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};
use serde::Serialize;

use crate::workspace::{Workspace, compile_glob_set};

pub struct ListDirTool {
    workspace: Workspace,
}

impl ListDirTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[derive(Debug, Serialize)]
struct Entry {
    name: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the files and subdirectories of a directory (defaults to the workspace root)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target_directory": {
                    "type": "string",
                    "description": "Directory to list, relative to the workspace root"
                },
                "ignore_globs": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Glob patterns of entries to leave out"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let target = arguments["target_directory"].as_str().unwrap_or(".");
        let patterns: Vec<&str> = arguments["ignore_globs"]
            .as_array()
            .map(|globs| globs.iter().filter_map(|g| g.as_str()).collect())
            .unwrap_or_default();
        let ignore = compile_glob_set(patterns)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid ignore glob: {e}")))?;

        let dir = self.workspace.resolve(target, self.name())?;
        if !dir.is_dir() {
            return Ok(ToolResult::failure(format!("Directory not found: {target}")));
        }

        let workspace = self.workspace.clone();
        let listing_dir = dir.clone();
        let children = tokio::task::spawn_blocking(move || workspace.list_children(&listing_dir))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_dir".into(),
                reason: e.to_string(),
            })?;

        let mut files = Vec::new();
        let mut directories = Vec::new();

        for entry in children {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = self.workspace.relative(entry.path());
            if ignore.is_match(&name) || ignore.is_match(&rel) {
                continue;
            }

            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_dir() {
                directories.push(Entry { name, path: rel, size: None });
            } else {
                files.push(Entry { name, path: rel, size: Some(meta.len()) });
            }
        }

        let mut listing = String::new();
        for d in &directories {
            listing.push_str(&format!("{}/\n", d.path));
        }
        for f in &files {
            listing.push_str(&format!("{} ({} bytes)\n", f.path, f.size.unwrap_or(0)));
        }

        Ok(ToolResult::with_data(
            listing.trim_end().to_string(),
            serde_json::json!({
                "directory": self.workspace.relative(&dir),
                "files": files,
                "directories": directories,
            }),
        ))
    }
}

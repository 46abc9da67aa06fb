//! File name search by glob pattern.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};

use crate::workspace::{Workspace, compile_glob};

const MAX_FILES: usize = 500;

pub struct GlobSearchTool {
    workspace: Workspace,
}

impl GlobSearchTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GlobSearchTool {
    fn name(&self) -> &str {
        "glob_file_search"
    }

    fn description(&self) -> &str {
        "Find files whose path matches a glob pattern such as `**/*.rs` or `src/*.toml`."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "glob_pattern": {
                    "type": "string",
                    "description": "Glob pattern (`*`, `**`, `?`, `[abc]` and `{a,b}` are supported)"
                },
                "target_directory": {
                    "type": "string",
                    "description": "Directory to search in (default: the workspace root)"
                }
            },
            "required": ["glob_pattern"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let pattern = arguments["glob_pattern"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'glob_pattern' argument".into()))?;
        let glob = compile_glob(pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid glob: {e}")))?;
        // A bare file pattern matches at any depth
        let match_name = !pattern.contains('/');

        let dir = self.workspace.resolve(
            arguments["target_directory"].as_str().unwrap_or("."),
            self.name(),
        )?;
        if !dir.is_dir() {
            return Ok(ToolResult::with_data(
                "No files found",
                serde_json::json!({ "files": [], "truncated": false }),
            ));
        }

        let workspace = self.workspace.clone();
        let scan = tokio::task::spawn_blocking(move || {
            workspace
                .walk_files(&dir)
                .into_iter()
                .filter(|file| {
                    let rel_to_dir = file
                        .strip_prefix(&dir)
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                        .unwrap_or_default();
                    glob.is_match(&rel_to_dir)
                        || (match_name && file.file_name().is_some_and(|n| glob.is_match(n)))
                })
                .map(|file| workspace.relative(&file))
                .collect::<Vec<_>>()
        });

        let mut files = scan.await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "glob_file_search".into(),
            reason: e.to_string(),
        })?;

        let truncated = files.len() > MAX_FILES;
        files.truncate(MAX_FILES);

        let output = if files.is_empty() {
            "No files found".to_string()
        } else {
            files.join("\n")
        };
        Ok(ToolResult::with_data(
            output,
            serde_json::json!({ "files": files, "truncated": truncated }),
        ))
    }
}

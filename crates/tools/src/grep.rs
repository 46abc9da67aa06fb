//! Regex search over workspace files.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};
use regex::RegexBuilder;

use crate::workspace::{Workspace, read_searchable};

const DEFAULT_MAX_RESULTS: usize = 50;

pub struct GrepTool {
    workspace: Workspace,
}

impl GrepTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns matches as `path:line:text`."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory to search (default: the whole workspace)"
                },
                "case_insensitive": {
                    "type": "boolean",
                    "description": "Ignore case when matching",
                    "default": false
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of matching lines to return",
                    "default": DEFAULT_MAX_RESULTS
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let pattern = arguments["pattern"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'pattern' argument".into()))?;
        let case_insensitive = arguments["case_insensitive"].as_bool().unwrap_or(false);
        let max_results = arguments["max_results"]
            .as_u64()
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid regex: {e}")))?;

        let target = self
            .workspace
            .resolve(arguments["path"].as_str().unwrap_or("."), self.name())?;
        if !target.exists() {
            return Ok(ToolResult::failure(format!(
                "Path not found: {}",
                self.workspace.relative(&target)
            )));
        }

        let workspace = self.workspace.clone();
        let scan = tokio::task::spawn_blocking(move || {
            let files = if target.is_file() {
                vec![target]
            } else {
                workspace.walk_files(&target)
            };

            let mut matches = Vec::new();
            let mut truncated = false;
            'files: for file in files {
                let Some(content) = read_searchable(&file) else {
                    continue;
                };
                for (idx, line) in content.lines().enumerate() {
                    if regex.is_match(line) {
                        if matches.len() == max_results {
                            truncated = true;
                            break 'files;
                        }
                        matches.push((workspace.relative(&file), idx + 1, line.to_string()));
                    }
                }
            }
            (matches, truncated)
        });

        let (matches, truncated) = scan.await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "grep".into(),
            reason: e.to_string(),
        })?;

        tracing::debug!(pattern, matches = matches.len(), truncated, "grep finished");

        if matches.is_empty() {
            return Ok(ToolResult::with_data(
                "No matches found",
                serde_json::json!({ "matches": [], "total_matches": 0, "truncated": false }),
            ));
        }

        let output = matches
            .iter()
            .map(|(file, line, text)| format!("{file}:{line}:{text}"))
            .collect::<Vec<_>>()
            .join("\n");
        let data = serde_json::json!({
            "matches": matches
                .iter()
                .map(|(file, line, text)| serde_json::json!({"file": file, "line": line, "text": text}))
                .collect::<Vec<_>>(),
            "total_matches": matches.len(),
            "truncated": truncated,
        });

        Ok(ToolResult::with_data(output, data))
    }
}

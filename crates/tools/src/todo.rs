//! Task list tool: keeps a JSON todo list in the workspace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};

use crate::workspace::Workspace;

pub const DEFAULT_TODO_FILE: &str = ".todo.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// On-disk layout of the todo file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct TodoList {
    #[serde(default)]
    todos: Vec<TodoItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

pub struct TodoWriteTool {
    workspace: Workspace,
    todo_file: String,
}

impl TodoWriteTool {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            todo_file: DEFAULT_TODO_FILE.into(),
        }
    }

    /// Store the list somewhere other than `.todo.json`.
    pub fn with_todo_file(mut self, path: impl Into<String>) -> Self {
        self.todo_file = path.into();
        self
    }

    async fn load(&self, path: &std::path::Path) -> Vec<TodoItem> {
        let Ok(text) = tokio::fs::read_to_string(path).await else {
            return Vec::new();
        };
        match serde_json::from_str::<TodoList>(&text) {
            Ok(list) => list.todos,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Ignoring unreadable todo file");
                Vec::new()
            }
        }
    }
}

/// Overlay `updates` on `existing` by id. Known ids keep their position,
/// new ones are appended.
fn merge_todos(mut existing: Vec<TodoItem>, updates: Vec<TodoItem>) -> Vec<TodoItem> {
    for update in updates {
        match existing.iter_mut().find(|t| t.id == update.id) {
            Some(slot) => *slot = update,
            None => existing.push(update),
        }
    }
    existing
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "todo_write"
    }

    fn description(&self) -> &str {
        "Create and update the task list for the current work. Each task has an id, content and a status of pending, in_progress, completed or cancelled."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "merge": {
                    "type": "boolean",
                    "description": "Merge with the existing tasks by id (true) or replace the whole list (false)",
                    "default": true
                },
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "content": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed", "cancelled"]
                            }
                        },
                        "required": ["id", "content", "status"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let merge = arguments["merge"].as_bool().unwrap_or(true);
        let todos = arguments
            .get("todos")
            .cloned()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'todos' argument".into()))?;
        let mut updates: Vec<TodoItem> = serde_json::from_value(todos)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid todos: {e}")))?;

        let now = Utc::now();
        for todo in &mut updates {
            todo.updated_at = Some(now);
        }

        let path = self.workspace.resolve(&self.todo_file, self.name())?;
        let todos = if merge {
            merge_todos(self.load(&path).await, updates)
        } else {
            updates
        };

        let list = TodoList {
            todos,
            updated_at: Some(now),
        };
        let body = serde_json::to_string_pretty(&list).map_err(|e| ToolError::ExecutionFailed {
            tool_name: self.name().into(),
            reason: e.to_string(),
        })?;

        if let Some(parent) = path.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::failure(format!("Failed to create directory: {e}")));
        }
        if let Err(e) = tokio::fs::write(&path, body).await {
            return Ok(ToolResult::failure(format!("Failed to save todos: {e}")));
        }

        let count = |status: TodoStatus| list.todos.iter().filter(|t| t.status == status).count();
        let rel = self.workspace.relative(&path);
        tracing::debug!(file = %rel, total = list.todos.len(), merge, "Todo list saved");

        Ok(ToolResult::with_data(
            format!("Saved {} tasks to {rel}", list.todos.len()),
            serde_json::json!({
                "file": rel,
                "total_todos": list.todos.len(),
                "pending": count(TodoStatus::Pending),
                "in_progress": count(TodoStatus::InProgress),
                "completed": count(TodoStatus::Completed),
                "cancelled": count(TodoStatus::Cancelled),
            }),
        ))
    }
}

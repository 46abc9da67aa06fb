//! Built-in coding tools for codewright.
//!
//! Tools give the agent the ability to work on a codebase: read, write
//! and edit files, list directories, search by regex or glob, run terminal
//! commands and linters, and keep a task list. Every file tool is confined
//! to the workspace root.

pub mod delete_file;
pub mod file_read;
pub mod file_write;
pub mod glob_search;
pub mod grep;
pub mod linter;
pub mod list_dir;
pub mod search_replace;
pub mod shell;
pub mod todo;
pub mod workspace;

pub use workspace::Workspace;

use codewright_config::AppConfig;
use codewright_core::error::Error;
use codewright_core::tool::{Tool, ToolRegistry};

/// Default upper bound for `run_terminal_cmd`.
const DEFAULT_MAX_TIMEOUT_SECS: u64 = 300;

/// Create the tool registry described by configuration.
///
/// Every built-in tool is registered unless `[tools.<name>] enabled = false`.
pub fn default_registry(config: &AppConfig) -> Result<ToolRegistry, Error> {
    let workspace = Workspace::new(&config.agent.workspace_root).map_err(|e| Error::Config {
        message: format!(
            "workspace root '{}' is not usable: {e}",
            config.agent.workspace_root.display()
        ),
    })?;

    let terminal = config.tool_settings("run_terminal_cmd");
    let allowed_commands = terminal
        .and_then(|t| t.get_string_list("allowed_commands"))
        .unwrap_or_default();
    let max_timeout_secs = terminal
        .and_then(|t| t.get_u64("max_timeout_secs"))
        .unwrap_or(DEFAULT_MAX_TIMEOUT_SECS);
    let todo_file = config
        .tool_settings("todo_write")
        .and_then(|t| t.get_str("todo_file"))
        .unwrap_or(todo::DEFAULT_TODO_FILE)
        .to_string();
    let lint_timeout = config
        .tool_settings("read_lints")
        .and_then(|t| t.get_u64("timeout_secs"));
    let protected = config
        .tool_settings("delete_file")
        .and_then(|t| t.get_string_list("protected"))
        .unwrap_or_default();

    let tools: Vec<Box<dyn Tool>> = vec![
        Box::new(file_read::ReadFileTool::new(workspace.clone())),
        Box::new(file_write::WriteFileTool::new(workspace.clone())),
        Box::new(search_replace::SearchReplaceTool::new(workspace.clone())),
        Box::new(delete_file::DeleteFileTool::new(workspace.clone()).with_protected(protected)),
        Box::new(list_dir::ListDirTool::new(workspace.clone())),
        Box::new(grep::GrepTool::new(workspace.clone())),
        Box::new(glob_search::GlobSearchTool::new(workspace.clone())),
        Box::new(todo::TodoWriteTool::new(workspace.clone()).with_todo_file(todo_file)),
        Box::new(match lint_timeout {
            Some(secs) => linter::ReadLintsTool::new(workspace.clone()).with_timeout_secs(secs),
            None => linter::ReadLintsTool::new(workspace.clone()),
        }),
        Box::new(shell::TerminalTool::new(
            workspace,
            allowed_commands,
            max_timeout_secs,
        )),
    ];

    let mut registry = ToolRegistry::new();
    for tool in tools {
        if !config.is_tool_enabled(tool.name()) {
            tracing::info!(tool = tool.name(), "Tool disabled by configuration");
            continue;
        }
        registry.try_register(tool)?;
    }

    tracing::debug!(tools = registry.len(), "Local tool registry ready");
    Ok(registry)
}

//! Terminal tool: execute shell commands in the workspace root.
//!
//! Supports command allowlisting, a deny list of destructive patterns,
//! and a bounded timeout.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::workspace::Workspace;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Substrings that are refused regardless of the allowlist.
const DENIED_PATTERNS: &[&str] = &["rm -rf /", "mkfs", "shutdown", "reboot", ":(){", "del /f"];

/// Shell syntax that chains or substitutes commands. Refused when an
/// allowlist is set, since only the first command would be checked.
const CHAINING_TOKENS: &[&str] = &[";", "&", "|", "`", "$(", ">", "<", "\n"];

pub struct TerminalTool {
    workspace: Workspace,
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    max_timeout_secs: u64,
}

impl TerminalTool {
    pub fn new(workspace: Workspace, allowed_commands: Vec<String>, max_timeout_secs: u64) -> Self {
        Self {
            workspace,
            allowed_commands,
            max_timeout_secs: max_timeout_secs.max(1),
        }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true; // No allowlist = all commands allowed
        }

        if Self::chaining_token(command).is_some() {
            return false;
        }
        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }

    fn chaining_token(command: &str) -> Option<&'static str> {
        CHAINING_TOKENS.iter().copied().find(|t| command.contains(t))
    }

    fn denied_pattern(command: &str) -> Option<&'static str> {
        let lower = command.to_lowercase();
        DENIED_PATTERNS.iter().copied().find(|p| lower.contains(p))
    }
}

/// Cap captured output so one command cannot flood the conversation.
fn clip(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_OUTPUT_BYTES {
        return text.into_owned();
    }
    let mut end = MAX_OUTPUT_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[output truncated]", &text[..end])
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &str {
        "run_terminal_cmd"
    }

    fn description(&self) -> &str {
        "Run a shell command in the workspace root and return its exit code, stdout and stderr. Use it for builds, tests, git and similar."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "description": "Timeout in seconds",
                    "default": DEFAULT_TIMEOUT_SECS
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;
        let timeout_secs = arguments["timeout_secs"]
            .as_u64()
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, self.max_timeout_secs);

        if !self.is_command_allowed(command) {
            let reason = match Self::chaining_token(command) {
                Some(token) => format!("Shell operator '{token}' is not allowed with a command allowlist"),
                None => format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            };
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason,
            });
        }

        if let Some(pattern) = Self::denied_pattern(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: self.name().into(),
                reason: format!("Command contains forbidden pattern '{pattern}'"),
            });
        }

        debug!(command = %command, timeout_secs, "Executing terminal command");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(self.workspace.root()).kill_on_drop(true);

        let output =
            match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Err(ToolError::ExecutionFailed {
                        tool_name: self.name().into(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(command = %command, timeout_secs, "Command timed out");
                    return Ok(ToolResult {
                        success: false,
                        output: format!("Command timed out after {timeout_secs}s"),
                        data: Some(serde_json::json!({
                            "exit_code": null,
                            "stdout": "",
                            "stderr": "",
                            "timed_out": true,
                        })),
                    });
                }
            };

        let stdout = clip(&output.stdout);
        let stderr = clip(&output.stderr);
        let success = output.status.success();
        let code = output.status.code();

        let summary = if success {
            if stderr.is_empty() {
                stdout.clone()
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            warn!(command = %command, exit_code = code.unwrap_or(-1), "Command failed");
            format!("[exit code: {}]\n{stdout}\n{stderr}", code.unwrap_or(-1))
        };

        Ok(ToolResult {
            success,
            output: summary.trim().to_string(),
            data: Some(serde_json::json!({
                "exit_code": code,
                "stdout": stdout,
                "stderr": stderr,
                "timed_out": false,
            })),
        })
    }
}

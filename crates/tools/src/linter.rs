//! Linter tool: run a local linter and report its diagnostics.
//!
//! `auto` picks `cargo clippy` when the workspace has a `Cargo.toml`,
//! otherwise the first of `ruff` and `flake8` that answers `--version`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{Tool, ToolResult};
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::workspace::Workspace;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_DIAGNOSTICS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linter {
    Clippy,
    Ruff,
    Flake8,
}

impl Linter {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "clippy" => Some(Self::Clippy),
            "ruff" => Some(Self::Ruff),
            "flake8" => Some(Self::Flake8),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Clippy => "clippy",
            Self::Ruff => "ruff",
            Self::Flake8 => "flake8",
        }
    }

    fn program(self) -> &'static str {
        match self {
            Self::Clippy => "cargo",
            Self::Ruff => "ruff",
            Self::Flake8 => "flake8",
        }
    }

    /// Program arguments. Clippy lints the whole package, so `paths` only
    /// apply to the Python linters.
    fn args(self, paths: &[String]) -> Vec<String> {
        let mut args: Vec<String> = match self {
            Self::Clippy => vec!["clippy".into(), "--message-format=short".into(), "--quiet".into()],
            Self::Ruff => vec!["check".into(), "--output-format=concise".into()],
            Self::Flake8 => Vec::new(),
        };
        if self != Self::Clippy {
            if paths.is_empty() {
                args.push(".".into());
            } else {
                args.extend(paths.iter().cloned());
            }
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// Pull `path:line:col: message` diagnostics out of linter output,
/// ignoring everything else.
pub fn parse_diagnostics(output: &str) -> Vec<Diagnostic> {
    output.lines().filter_map(parse_diagnostic).collect()
}

fn parse_diagnostic(line: &str) -> Option<Diagnostic> {
    let mut parts = line.trim_end().splitn(4, ':');
    let file = parts.next().filter(|f| !f.is_empty() && !f.starts_with(char::is_whitespace))?;
    let line_no = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    let message = parts.next()?.strip_prefix(' ')?.trim();
    if message.is_empty() {
        return None;
    }
    Some(Diagnostic {
        file: file.to_string(),
        line: line_no,
        column,
        message: message.to_string(),
    })
}

pub struct ReadLintsTool {
    workspace: Workspace,
    timeout_secs: u64,
}

impl ReadLintsTool {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Choose a linter for the workspace, or `None` when nothing is installed.
    pub async fn detect(&self) -> Option<Linter> {
        if self.workspace.root().join("Cargo.toml").is_file() {
            return Some(Linter::Clippy);
        }
        for linter in [Linter::Ruff, Linter::Flake8] {
            if self.answers_version(linter).await {
                return Some(linter);
            }
        }
        None
    }

    async fn answers_version(&self, linter: Linter) -> bool {
        let mut check = Command::new(linter.program());
        check
            .arg("--version")
            .current_dir(self.workspace.root())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        matches!(
            tokio::time::timeout(VERSION_CHECK_TIMEOUT, check.status()).await,
            Ok(Ok(_))
        )
    }
}

#[async_trait]
impl Tool for ReadLintsTool {
    fn name(&self) -> &str {
        "read_lints"
    }

    fn description(&self) -> &str {
        "Run the project's linter (cargo clippy, ruff or flake8) and return the reported problems as file, line, column and message."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Files or directories to check (default: the whole workspace)"
                },
                "linter": {
                    "type": "string",
                    "enum": ["auto", "clippy", "ruff", "flake8"],
                    "description": "Linter to run; auto picks one for the workspace",
                    "default": "auto"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let requested = arguments["linter"].as_str().unwrap_or("auto");
        let explicit = match requested {
            "auto" => None,
            name => Some(Linter::parse(name).ok_or_else(|| {
                ToolError::InvalidArguments(format!("Unsupported linter: {name}"))
            })?),
        };

        let mut paths = Vec::new();
        for raw in arguments["paths"].as_array().into_iter().flatten() {
            let raw = raw
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("'paths' must be strings".into()))?;
            let resolved = self.workspace.resolve(raw, self.name())?;
            paths.push(self.workspace.relative(&resolved));
        }

        let linter = match explicit {
            Some(linter) => linter,
            None => match self.detect().await {
                Some(linter) => linter,
                None => {
                    return Ok(ToolResult::failure(
                        "No supported linter found (tried cargo clippy, ruff, flake8)",
                    ));
                }
            },
        };

        debug!(linter = linter.name(), paths = paths.len(), "Running linter");
        let mut cmd = Command::new(linter.program());
        cmd.args(linter.args(&paths))
            .current_dir(self.workspace.root())
            .kill_on_drop(true);

        let output =
            match tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(ToolResult::failure(format!(
                        "{} is not installed",
                        linter.program()
                    )));
                }
                Ok(Err(e)) => {
                    return Err(ToolError::ExecutionFailed {
                        tool_name: self.name().into(),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    warn!(linter = linter.name(), timeout_secs = self.timeout_secs, "Linter timed out");
                    return Ok(ToolResult::failure(format!(
                        "{} timed out after {}s",
                        linter.name(),
                        self.timeout_secs
                    )));
                }
            };

        // Clippy reports on stderr, the Python linters on stdout
        let mut diagnostics = parse_diagnostics(&String::from_utf8_lossy(&output.stdout));
        diagnostics.extend(parse_diagnostics(&String::from_utf8_lossy(&output.stderr)));
        let total = diagnostics.len();
        diagnostics.truncate(MAX_DIAGNOSTICS);

        let summary = if diagnostics.is_empty() {
            format!("{}: no problems found", linter.name())
        } else {
            diagnostics
                .iter()
                .map(|d| format!("{}:{}:{}: {}", d.file, d.line, d.column, d.message))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(ToolResult::with_data(
            summary,
            serde_json::json!({
                "linter": linter.name(),
                "exit_code": output.status.code(),
                "error_count": total,
                "errors": diagnostics,
                "truncated": total > MAX_DIAGNOSTICS,
            }),
        ))
    }
}
